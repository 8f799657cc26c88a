// Device token generation for the `hexin-v` request header.

mod codec;
mod device;

pub use codec::{ENVELOPE_VERSION, TokenCodec};
pub use device::{BUFFER_LEN, DeviceProfile};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Header name the search endpoint reads the token from.
pub const TOKEN_HEADER: &str = "hexin-v";

/// Current Unix time in whole seconds, saturating into the 32-bit field.
pub(crate) fn epoch_secs() -> u32 {
    u32::try_from(chrono::Utc::now().timestamp()).unwrap_or(u32::MAX)
}

/// Produces a fresh token per request from one long-lived [`DeviceProfile`].
///
/// The random source is injected so token sequences are reproducible with
/// a seeded RNG. Generation mutates the profile, so it takes `&mut self`.
#[derive(Debug)]
pub struct TokenGenerator<R = StdRng> {
    profile: DeviceProfile,
    rng: R,
    user_agent: String,
}

impl TokenGenerator<StdRng> {
    /// Generator seeded from OS entropy.
    pub fn from_entropy(user_agent: impl Into<String>) -> Self {
        Self::new(user_agent, StdRng::from_entropy())
    }
}

impl<R: Rng> TokenGenerator<R> {
    pub fn new(user_agent: impl Into<String>, mut rng: R) -> Self {
        let user_agent = user_agent.into();
        let profile = DeviceProfile::new(&user_agent, &mut rng, epoch_secs());
        Self {
            profile,
            rng,
            user_agent,
        }
    }

    /// Build from an existing profile, e.g. one with fixed fields in tests.
    pub fn with_profile(profile: DeviceProfile, user_agent: impl Into<String>, rng: R) -> Self {
        Self {
            profile,
            rng,
            user_agent: user_agent.into(),
        }
    }

    /// Refresh the profile against the system clock and encode it.
    pub fn generate_token(&mut self) -> String {
        self.generate_token_at(epoch_secs())
    }

    /// Refresh the profile with an explicit timestamp and encode it.
    pub fn generate_token_at(&mut self, now: u32) -> String {
        self.profile.refresh(&mut self.rng, now);
        let token = TokenCodec::encode(&self.profile.to_buffer());
        tracing::trace!(counter = self.profile.counter(), "generated device token");
        token
    }

    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Mutable access to the injected random source, shared with request ids.
    pub fn rng_mut(&mut self) -> &mut R {
        &mut self.rng
    }
}
