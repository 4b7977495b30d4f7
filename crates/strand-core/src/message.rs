use alloc::{boxed::Box, vec::Vec};
use core::any::Any;
use core::fmt;

/// 自定义用户事件的统一载体。
pub type UserEvent = Box<dyn Any + Send + Sync>;

/// 链路中流动的统一消息抽象。
///
/// # 设计背景（Why）
/// - 入站字节流与应用层对象流共用同一条 Handler 链，需要一个既能承载原始
///   字节、又能承载任意解码产物的消息类型；
/// - 使用 `dyn Any` 做类型擦除，保证链路核心不感知业务类型，解码/编码
///   Handler 在边界处自行下转型。
///
/// # 契约说明（What）
/// - **前置条件**：用户对象必须满足 `Send + Sync + 'static`，保证消息可以
///   跨线程交付给连接的执行者；
/// - **后置条件**：[`try_into_user`](Self::try_into_user) 下转型失败时原样
///   归还消息，不丢失数据。
pub enum Message {
    /// 原始字节负载，通常由传输层读取或最终写向传输层。
    Bytes(Vec<u8>),
    /// 类型擦除后的业务对象，由编解码 Handler 产出或消费。
    User(Box<dyn Any + Send + Sync>),
}

impl Message {
    /// 从字节序列构造消息。
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Message::Bytes(bytes.into())
    }

    /// 从业务对象构造消息。
    pub fn from_user<T: Any + Send + Sync>(value: T) -> Self {
        Message::User(Box::new(value))
    }

    /// 尝试以 `T` 借用内部业务对象。
    pub fn user_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Message::User(boxed) => boxed.downcast_ref::<T>(),
            Message::Bytes(_) => None,
        }
    }

    /// 尝试取出内部业务对象；类型不匹配时归还原消息。
    pub fn try_into_user<T: Any>(self) -> Result<T, Self> {
        match self {
            Message::User(boxed) => match boxed.downcast::<T>() {
                Ok(value) => Ok(*value),
                Err(boxed) => Err(Message::User(boxed)),
            },
            other => Err(other),
        }
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Bytes(bytes) => f
                .debug_tuple("Message::Bytes")
                .field(&bytes.len())
                .finish(),
            Message::User(_) => f.write_str("Message::User(..)"),
        }
    }
}
