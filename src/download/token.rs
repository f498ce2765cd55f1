//! Dispatch tokens bounding concurrent file transfers.
//!
//! A bounded channel preloaded with `max_parallel` tokens, acquired before a
//! transfer is spawned and returned to the pool when it completes.

use tokio::sync::mpsc;

/// A dispatch ticket bearing a stable slot number.
///
/// Caps concurrent transfers and doubles as the active file's progress-bar
/// row, so the same number always lands the same bar in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    n: u32,
}

impl Token {
    /// Returns this token's 1-based slot number.
    #[must_use]
    pub fn n(self) -> u32 {
        self.n
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Token({})", self.n)
    }
}

/// Bounded pool of [`Token`]s, one per concurrently permitted file transfer.
///
/// Strict discipline: acquire before spawning a transfer, release once it
/// completes (success, failure, or cancellation).
pub struct TokenPool {
    sender: mpsc::Sender<Token>,
    receiver: mpsc::Receiver<Token>,
}

impl TokenPool {
    /// Builds a pool preloaded with tokens numbered `1..=max_parallel`.
    #[must_use]
    pub fn new(max_parallel: u32) -> Self {
        let capacity = max_parallel.max(1) as usize;
        let (sender, receiver) = mpsc::channel(capacity);
        for n in 1..=max_parallel.max(1) {
            if sender.try_send(Token { n }).is_err() {
                break;
            }
        }
        Self { sender, receiver }
    }

    /// Acquires a token, waiting if the pool is currently exhausted.
    ///
    /// # Panics
    ///
    /// Panics if the channel is closed, which cannot happen: the pool owns
    /// its own sender for its entire lifetime.
    #[allow(clippy::expect_used)]
    pub async fn acquire(&mut self) -> Token {
        self.receiver
            .recv()
            .await
            .expect("token pool's own sender is held for its entire lifetime")
    }

    /// Returns a token to the pool so another transfer may acquire it.
    pub fn release(&self, token: Token) {
        // Capacity always matches the number of tokens in circulation, so
        // this cannot block; the pool's own receiver is never dropped early.
        let _ = self.sender.try_send(token);
    }

    /// A cheap, cloneable handle that can release tokens back to this pool
    /// from a spawned task, without needing access to the pool itself (whose
    /// `acquire` keeps the receiver half exclusively for the dispatch loop).
    #[must_use]
    pub fn releaser(&self) -> TokenReleaser {
        TokenReleaser(self.sender.clone())
    }
}

/// Releases tokens back to the [`TokenPool`] that issued them.
#[derive(Clone)]
pub struct TokenReleaser(mpsc::Sender<Token>);

impl TokenReleaser {
    /// Returns `token` to the pool so another transfer may acquire it.
    pub fn release(&self, token: Token) {
        let _ = self.0.try_send(token);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pool_hands_out_numbered_tokens() {
        let mut pool = TokenPool::new(3);
        let mut numbers = vec![
            pool.acquire().await.n(),
            pool.acquire().await.n(),
            pool.acquire().await.n(),
        ];
        numbers.sort_unstable();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_released_token_is_reacquirable() {
        let mut pool = TokenPool::new(1);
        let token = pool.acquire().await;
        pool.release(token);
        let reacquired = pool.acquire().await;
        assert_eq!(reacquired.n(), token.n());
    }

    #[tokio::test]
    async fn test_pool_blocks_when_exhausted() {
        let mut pool = TokenPool::new(1);
        let _token = pool.acquire().await;
        let result = tokio::time::timeout(std::time::Duration::from_millis(50), pool.acquire()).await;
        assert!(result.is_err(), "acquire should not resolve while the pool is empty");
    }

    #[tokio::test]
    async fn test_releaser_returns_token_usable_by_pool() {
        let mut pool = TokenPool::new(1);
        let token = pool.acquire().await;
        let releaser = pool.releaser();
        releaser.release(token);
        let reacquired = pool.acquire().await;
        assert_eq!(reacquired.n(), token.n());
    }

    #[test]
    fn test_token_display() {
        let token = Token { n: 4 };
        assert_eq!(token.to_string(), "Token(4)");
    }
}
