use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// Custom epoch: 2024-01-01T00:00:00Z in milliseconds since Unix epoch.
const HEARTH_EPOCH_MS: u64 = 1_704_067_200_000;

const WORKER_BITS: u64 = 10;
const SEQUENCE_BITS: u64 = 12;
const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1; // 4095

struct State {
    last_ms: u64,
    sequence: u64,
}

/// 64-bit snowflake ID generator for message ids.
///
/// Layout (MSB → LSB):
/// - Bits 63–22: Timestamp (42 bits) — ms since Hearth epoch
/// - Bits 21–12: Worker ID (10 bits)
/// - Bits 11–0:  Sequence (12 bits) — per-ms counter, max 4096/ms
pub struct SnowflakeGenerator {
    worker_id: u64,
    state: Mutex<State>,
}

impl SnowflakeGenerator {
    pub fn new(worker_id: u16) -> Self {
        assert!(
            (worker_id as u64) < (1 << WORKER_BITS),
            "worker_id must fit in {WORKER_BITS} bits"
        );
        Self {
            worker_id: worker_id as u64,
            state: Mutex::new(State {
                last_ms: 0,
                sequence: 0,
            }),
        }
    }

    pub fn generate(&self) -> i64 {
        let mut state = self.state.lock().unwrap();

        let mut now_ms = current_ms();

        if now_ms < state.last_ms {
            panic!(
                "Clock moved backwards: last_ms={}, now_ms={}",
                state.last_ms, now_ms
            );
        }

        if now_ms == state.last_ms {
            state.sequence = (state.sequence + 1) & SEQUENCE_MASK;
            if state.sequence == 0 {
                // Sequence exhausted for this millisecond — spin-wait.
                while now_ms == state.last_ms {
                    now_ms = current_ms();
                }
            }
        } else {
            state.sequence = 0;
        }

        state.last_ms = now_ms;

        let ts = now_ms - HEARTH_EPOCH_MS;
        let id = (ts << (WORKER_BITS + SEQUENCE_BITS))
            | (self.worker_id << SEQUENCE_BITS)
            | state.sequence;

        id as i64
    }
}

fn current_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before Unix epoch")
        .as_millis() as u64
}

/// Extract the creation timestamp (ms since Unix epoch) from a snowflake ID.
pub fn snowflake_timestamp_ms(id: i64) -> u64 {
    let ts = (id as u64) >> (WORKER_BITS + SEQUENCE_BITS);
    ts + HEARTH_EPOCH_MS
}
