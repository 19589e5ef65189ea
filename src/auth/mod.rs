// ABOUTME: Authenticated-session mode — envelope decryption, bearer tokens, per-token pools
// ABOUTME: Entry point is AuthSessionManager; only it mutates token/pool state (spec §4.6)

pub mod envelope;
pub mod keys;
pub mod pool;
pub mod session;

pub use envelope::{AuthRequest, Credentials, Envelope, EnvelopePayload};
pub use keys::KeyPair;
pub use pool::AuthPool;
pub use session::{reap_forever, AuthSessionManager, IssueResponse, SessionRecord};
