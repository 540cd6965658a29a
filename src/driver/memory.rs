use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};

use async_trait::async_trait;
use dashmap::DashMap;
use streamhub_error::{DriverError, WriterError};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, trace};

use super::{ListenerDriver, Writer};
use crate::message::Message;

/// Ёмкость очереди одной группы по умолчанию.
pub const DEFAULT_BUS_CAPACITY: usize = 1024;

/// Шина в памяти: одновременно [`Writer`] и [`ListenerDriver`].
///
/// Для каждого потока хранится набор групп; каждая группа получает свою
/// копию сообщения, а воркеры внутри группы конкурируют за него. Очередь
/// группы ограничена, поэтому запись ждёт, пока самая медленная группа не
/// освободит место. Сообщения потока без групп считаются недоставленными.
#[derive(Debug)]
pub struct InMemoryBus {
    streams: DashMap<String, Vec<Arc<GroupQueue>>>,
    capacity: usize,
    undelivered: AtomicU64,
    closed: AtomicBool,
}

#[derive(Debug)]
struct GroupQueue {
    group: String,
    sender: parking_lot::Mutex<Option<mpsc::Sender<Message>>>,
    receiver: Mutex<mpsc::Receiver<Message>>,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl InMemoryBus {
    /// Создаёт шину; нулевая ёмкость поднимается до единицы.
    pub fn new(capacity: usize) -> Self {
        Self {
            streams: DashMap::new(),
            capacity: capacity.max(1),
            undelivered: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Число сообщений, записанных в потоки без единой группы.
    pub fn undelivered(&self) -> u64 {
        self.undelivered.load(Ordering::Relaxed)
    }

    /// Группы, подписанные на поток.
    pub fn groups(
        &self,
        stream: &str,
    ) -> Vec<String> {
        self.streams
            .get(stream)
            .map(|queues| queues.iter().map(|q| q.group.clone()).collect())
            .unwrap_or_default()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Закрывает шину. Новые записи отклоняются, а получатели дочитывают
    /// уже поставленные в очередь сообщения и затем видят конец потока.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        for entry in self.streams.iter() {
            for queue in entry.value() {
                queue.sender.lock().take();
            }
        }
        debug!("in-memory bus closed");
    }

    fn queue(
        &self,
        stream: &str,
        group: &str,
    ) -> Arc<GroupQueue> {
        let mut queues = self.streams.entry(stream.to_string()).or_default();
        if let Some(queue) = queues.iter().find(|q| q.group == group) {
            return Arc::clone(queue);
        }

        let (tx, rx) = mpsc::channel(self.capacity);
        // Группа, созданная после закрытия, сразу видит конец потока.
        let sender = if self.is_closed() { None } else { Some(tx) };
        let queue = Arc::new(GroupQueue {
            group: group.to_string(),
            sender: parking_lot::Mutex::new(sender),
            receiver: Mutex::new(rx),
        });
        queues.push(Arc::clone(&queue));
        debug!(stream, group, "consumer group created");
        queue
    }
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Реализация транспорта
////////////////////////////////////////////////////////////////////////////////

#[async_trait]
impl Writer for InMemoryBus {
    async fn write(
        &self,
        message: Message,
    ) -> Result<(), WriterError> {
        if self.is_closed() {
            return Err(WriterError::new(message.stream(), "in-memory bus is closed"));
        }

        // Снимок групп: ссылка на шард DashMap не должна жить через await.
        let queues: Vec<Arc<GroupQueue>> = self
            .streams
            .get(message.stream())
            .map(|queues| queues.value().clone())
            .unwrap_or_default();

        if queues.is_empty() {
            self.undelivered.fetch_add(1, Ordering::Relaxed);
            trace!(stream = message.stream(), id = message.id(), "no consumer groups, message dropped");
            return Ok(());
        }

        // Запись либо уходит во все группы, либо не уходит ни в одну: места
        // резервируются во всех очередях до первой отправки.
        let mut senders = Vec::with_capacity(queues.len());
        for queue in &queues {
            let sender = queue.sender.lock().clone();
            let Some(sender) = sender else {
                return Err(WriterError::new(message.stream(), "in-memory bus is closed"));
            };
            senders.push((queue.group.as_str(), sender));
        }

        let mut permits = Vec::with_capacity(senders.len());
        for (group, sender) in &senders {
            let permit = sender
                .reserve()
                .await
                .map_err(|_| WriterError::new(message.stream(), "consumer group queue closed"))?;
            permits.push((*group, permit));
        }

        for (group, permit) in permits {
            permit.send(message.clone().with_group_name(group));
        }

        Ok(())
    }
}

#[async_trait]
impl ListenerDriver for InMemoryBus {
    fn prepare(
        &self,
        stream: &str,
        group: &str,
    ) -> Result<(), DriverError> {
        self.queue(stream, group);
        Ok(())
    }

    async fn receive(
        &self,
        stream: &str,
        group: &str,
    ) -> Result<Option<Message>, DriverError> {
        let queue = self.queue(stream, group);
        let mut receiver = queue.receiver.lock().await;
        Ok(receiver.recv().await)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
