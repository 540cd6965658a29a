use std::{sync::Arc, time::Duration};

use tokio::{sync::watch, task::JoinHandle};

/// Токен кооперативной остановки.
///
/// Клоны разделяют одно состояние: отмена через любой клон видна всем
/// остальным. Отмена необратима.
#[derive(Debug, Clone)]
pub struct ShutdownToken {
    sender: Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl ShutdownToken {
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }

    /// Запрашивает остановку всех задач, наблюдающих за токеном.
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Завершается, когда токен отменён (сразу, если уже отменён).
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        // Отправитель живёт, пока жив `self`, поэтому ошибка невозможна.
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }

    /// Отменяет токен по истечении `after`. Требует запущенного runtime.
    pub fn cancel_after(
        &self,
        after: Duration,
    ) -> JoinHandle<()> {
        let token = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            token.cancel();
        })
    }
}

impl Default for ShutdownToken {
    fn default() -> Self {
        Self::new()
    }
}
