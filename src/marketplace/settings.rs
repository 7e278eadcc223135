// ==========================================
// Каталог автозапчастей - защита учётных данных
// ==========================================
// Пароль маркетплейса хранится в обратимом подписанном
// виде: base64(пароль) + ":" + hex(HMAC-SHA256(секрет)).
// Открытый текст восстановим (он нужен для вычисления
// sha512-учётки при выгрузке), но подмена значения в базе
// обнаруживается по подписи.
// ==========================================

use crate::marketplace::SyncError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Подписать пароль секретом процесса.
pub fn sign_password(secret: &str, plain: &str) -> String {
    let encoded = STANDARD.encode(plain.as_bytes());
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC принимает ключ любой длины");
    mac.update(encoded.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());
    format!("{encoded}:{signature}")
}

/// Восстановить пароль, проверив подпись.
pub fn unsign_password(secret: &str, signed: &str) -> Result<String, SyncError> {
    let (encoded, signature_hex) = signed
        .rsplit_once(':')
        .ok_or(SyncError::BadCredentialSignature)?;

    let signature = hex::decode(signature_hex).map_err(|_| SyncError::BadCredentialSignature)?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC принимает ключ любой длины");
    mac.update(encoded.as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| SyncError::BadCredentialSignature)?;

    let plain = STANDARD
        .decode(encoded)
        .map_err(|_| SyncError::BadCredentialSignature)?;
    String::from_utf8(plain).map_err(|_| SyncError::BadCredentialSignature)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_unsign_roundtrip() {
        let signed = sign_password("секрет-процесса", "пароль-дилера");
        assert_ne!(signed, "пароль-дилера");
        let plain = unsign_password("секрет-процесса", &signed).unwrap();
        assert_eq!(plain, "пароль-дилера");
    }

    #[test]
    fn test_tampered_value_rejected() {
        let signed = sign_password("секрет", "пароль");
        let mut tampered = signed.clone();
        tampered.replace_range(0..1, "X");
        assert!(unsign_password("секрет", &tampered).is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let signed = sign_password("секрет-1", "пароль");
        assert!(unsign_password("секрет-2", &signed).is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(unsign_password("секрет", "без двоеточия").is_err());
        assert!(unsign_password("секрет", "a:не-hex").is_err());
    }
}
