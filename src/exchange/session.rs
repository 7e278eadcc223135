// ==========================================
// Каталог автозапчастей - сессии обмена
// ==========================================
// Сеанс открывается режимом checkauth: выпускается
// непрозрачный url-safe токен на 32 байта, который клиент
// возвращает в cookie. Хранение - кеш в памяти процесса
// с вытеснением по TTL; в кластерной конфигурации кеш
// должен быть внешним.
// ==========================================

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use dashmap::DashMap;
use rand::RngCore;
use std::time::{Duration, Instant};

/// Имя cookie сеанса обмена.
pub const SESSION_COOKIE_NAME: &str = "exchange_session";

pub struct SessionCache {
    sessions: DashMap<String, Instant>,
    ttl: Duration,
}

impl SessionCache {
    pub fn new(ttl: Duration) -> Self {
        SessionCache {
            sessions: DashMap::new(),
            ttl,
        }
    }

    /// Выпуск нового токена сеанса.
    pub fn mint(&self) -> String {
        self.sweep();

        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        let token = URL_SAFE_NO_PAD.encode(bytes);

        self.sessions.insert(token.clone(), Instant::now() + self.ttl);
        token
    }

    /// Действителен ли токен. Просроченные записи удаляются.
    pub fn validate(&self, token: &str) -> bool {
        if token.is_empty() {
            return false;
        }
        let expires_at = match self.sessions.get(token) {
            Some(entry) => *entry,
            None => return false,
        };
        if expires_at > Instant::now() {
            true
        } else {
            self.sessions.remove(token);
            false
        }
    }

    /// Удаление просроченных сеансов.
    fn sweep(&self) {
        let now = Instant::now();
        self.sessions.retain(|_, expires_at| *expires_at > now);
    }

    #[cfg(test)]
    pub fn insert_expiring(&self, token: &str, ttl: Duration) {
        self.sessions
            .insert(token.to_string(), Instant::now() + ttl);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mint_and_validate() {
        let cache = SessionCache::new(Duration::from_secs(3600));
        let token = cache.mint();
        assert!(token.len() >= 40); // 32 байта в base64 без паддинга = 43 символа
        assert!(cache.validate(&token));
        assert!(!cache.validate("неизвестный"));
        assert!(!cache.validate(""));
    }

    #[test]
    fn test_tokens_unique() {
        let cache = SessionCache::new(Duration::from_secs(3600));
        let a = cache.mint();
        let b = cache.mint();
        assert_ne!(a, b);
    }

    #[test]
    fn test_expired_token_rejected() {
        let cache = SessionCache::new(Duration::from_secs(3600));
        cache.insert_expiring("старый", Duration::from_millis(0));
        std::thread::sleep(Duration::from_millis(5));
        assert!(!cache.validate("старый"));
    }
}
