//! Value objects.

use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::error::ValueObjectError;

/// Server-assigned connection identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Monotonic source of [`ConnectionId`]s.
///
/// Ids start at 0 and are never reused within the lifetime of the generator.
#[derive(Debug, Default)]
pub struct ConnectionIdGenerator {
    next: AtomicU64,
}

impl ConnectionIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> ConnectionId {
        ConnectionId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

pub const ROOM_ID_LEN: usize = 10;
pub const ROOM_ID_ALPHABET: &str = "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Room identifier: [`ROOM_ID_LEN`] characters drawn from [`ROOM_ID_ALPHABET`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    pub fn parse(value: &str) -> Result<Self, ValueObjectError> {
        let found = value.chars().count();
        if found != ROOM_ID_LEN {
            return Err(ValueObjectError::InvalidRoomIdLength {
                expected: ROOM_ID_LEN,
                found,
            });
        }
        for (index, ch) in value.chars().enumerate() {
            if !ROOM_ID_ALPHABET.contains(ch) {
                return Err(ValueObjectError::InvalidRoomIdCharacter { ch, index });
            }
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Random [`RoomId`] generation
pub struct RoomIdFactory;

impl RoomIdFactory {
    pub fn generate() -> RoomId {
        let mut rng = rand::rng();
        let alphabet = ROOM_ID_ALPHABET.as_bytes();
        let mut id = String::with_capacity(ROOM_ID_LEN);
        for _ in 0..ROOM_ID_LEN {
            let idx = rng.random_range(0..alphabet.len());
            id.push(alphabet[idx] as char);
        }
        RoomId(id)
    }
}

/// Display name chosen by a client. Compared case-sensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Username(String);

impl Username {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        if value.trim().is_empty() {
            return Err(ValueObjectError::EmptyUsername);
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Username {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Unix timestamp in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(millis: i64) -> Self {
        Self(millis)
    }

    pub fn value(self) -> i64 {
        self.0
    }

    /// Milliseconds elapsed from `self` until `now` (negative if `now` is earlier).
    pub fn elapsed_until(self, now: Timestamp) -> i64 {
        now.0 - self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_generator_is_monotonic() {
        // テスト項目: 接続 ID が 0 から単調増加で払い出される
        // given (前提条件):
        let generator = ConnectionIdGenerator::new();

        // when (操作):
        let ids: Vec<ConnectionId> = (0..3).map(|_| generator.next_id()).collect();

        // then (期待する結果):
        assert_eq!(
            ids,
            vec![
                ConnectionId::new(0),
                ConnectionId::new(1),
                ConnectionId::new(2)
            ]
        );
    }

    #[test]
    fn test_generated_room_id_uses_alphabet() {
        // テスト項目: 生成された Room ID が固定長かつ許可された文字のみで構成される
        // given (前提条件):

        // when (操作):
        let id = RoomIdFactory::generate();

        // then (期待する結果):
        assert_eq!(id.as_str().len(), ROOM_ID_LEN);
        assert!(id.as_str().chars().all(|ch| ROOM_ID_ALPHABET.contains(ch)));
        assert_eq!(RoomId::parse(id.as_str()), Ok(id));
    }

    #[test]
    fn test_room_id_parse_rejects_wrong_length() {
        // テスト項目: 長さの異なる Room ID はエラーになる
        // given (前提条件):
        let value = "ABC";

        // when (操作):
        let result = RoomId::parse(value);

        // then (期待する結果):
        assert_eq!(
            result,
            Err(ValueObjectError::InvalidRoomIdLength {
                expected: ROOM_ID_LEN,
                found: 3
            })
        );
    }

    #[test]
    fn test_room_id_parse_rejects_lowercase() {
        // テスト項目: 小文字を含む Room ID はエラーになる
        // given (前提条件):
        let value = "ABCDEFGHIj";

        // when (操作):
        let result = RoomId::parse(value);

        // then (期待する結果):
        assert_eq!(
            result,
            Err(ValueObjectError::InvalidRoomIdCharacter { ch: 'j', index: 9 })
        );
    }

    #[test]
    fn test_username_rejects_blank() {
        // テスト項目: 空白のみのユーザー名はエラーになる
        // given (前提条件):
        let value = "   ".to_string();

        // when (操作):
        let result = Username::new(value);

        // then (期待する結果):
        assert_eq!(result, Err(ValueObjectError::EmptyUsername));
    }

    #[test]
    fn test_username_accepts_long_names() {
        // テスト項目: 長いユーザー名も空白以外を含めばそのまま受け付けられる
        // given (前提条件):
        let value = "a".repeat(1_000);

        // when (操作):
        let result = Username::try_from(value.clone());

        // then (期待する結果):
        assert_eq!(result.map(|name| name.as_str().to_string()), Ok(value));
    }

    #[test]
    fn test_username_keeps_case() {
        // テスト項目: ユーザー名は大文字小文字を区別して保持される
        // given (前提条件):
        let alice = Username::new("Alice".to_string()).unwrap();

        // when (操作):
        let lower = Username::new("alice".to_string()).unwrap();

        // then (期待する結果):
        assert_ne!(alice, lower);
        assert_eq!(alice.as_str(), "Alice");
    }

    #[test]
    fn test_timestamp_elapsed_until() {
        // テスト項目: 2 つのタイムスタンプ間の経過ミリ秒が計算される
        // given (前提条件):
        let start = Timestamp::new(1_000);

        // when (操作):
        let elapsed = start.elapsed_until(Timestamp::new(4_500));

        // then (期待する結果):
        assert_eq!(elapsed, 3_500);
    }
}
