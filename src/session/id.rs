use crate::traits::session::{SessionId, SessionIdGenerator};
use rand::RngCore;

/// Random bytes per generated id
const SESSION_ID_BYTES: usize = 16;

/// Generates session ids from the operating system CSPRNG
///
/// Ids are 16 random bytes, hex-encoded to 32 characters.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIdGenerator;

impl SessionIdGenerator for RandomIdGenerator {
    fn generate(&self) -> SessionId {
        let mut bytes = [0u8; SESSION_ID_BYTES];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        SessionId::new(hex::encode(bytes))
    }
}
