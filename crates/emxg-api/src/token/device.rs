// Device telemetry profile
//
// A fixed sequence of big-endian fields, 43 bytes in total. Identity
// fields (random id, user-agent hash) are drawn once; time fields and
// behavior counters change on every refresh.

use rand::{Rng, RngCore};

use super::codec::TokenCodec;

/// Serialized size of a [`DeviceProfile`].
pub const BUFFER_LEN: usize = 43;

const BROWSER_INDEX: u32 = 11;
const BROWSER_FEATURE: u32 = 2848;
const PROFILE_VERSION: u32 = 3;

const MAX_BEHAVIOR_COUNT: u32 = 10_000;
const SCREEN_WIDTH: u32 = 1920;
const SCREEN_HEIGHT: u32 = 1080;

/// Telemetry-like device state behind every token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceProfile {
    pub(crate) random_id: u32,
    pub(crate) server_time: u32,
    pub(crate) client_time: u32,
    pub(crate) user_agent_hash: u32,
    pub(crate) platform: u32,
    pub(crate) browser_index: u32,
    pub(crate) plugin_count: u32,
    pub(crate) mouse_moves: u32,
    pub(crate) mouse_clicks: u32,
    pub(crate) mouse_scrolls: u32,
    pub(crate) key_presses: u32,
    pub(crate) mouse_x: u32,
    pub(crate) mouse_y: u32,
    pub(crate) browser_feature: u32,
    pub(crate) reserved1: u32,
    pub(crate) reserved2: u32,
    pub(crate) counter: u16,
    pub(crate) version: u32,
}

impl DeviceProfile {
    /// Create a profile for `user_agent`, drawing the random id from `rng`.
    pub fn new<R: RngCore>(user_agent: &str, rng: &mut R, now: u32) -> Self {
        Self {
            random_id: rng.next_u32(),
            server_time: now,
            client_time: 0,
            user_agent_hash: TokenCodec::str_hash(user_agent),
            platform: 0,
            browser_index: BROWSER_INDEX,
            plugin_count: 0,
            mouse_moves: 0,
            mouse_clicks: 0,
            mouse_scrolls: 0,
            key_presses: 0,
            mouse_x: 0,
            mouse_y: 0,
            browser_feature: BROWSER_FEATURE,
            reserved1: 0,
            reserved2: 0,
            counter: 0,
            version: PROFILE_VERSION,
        }
    }

    /// Advance the profile for the next token.
    ///
    /// Bumps the counter (wrapping at 2^16), stamps both time fields with
    /// `now` and redraws the behavior counters and mouse position.
    pub fn refresh<R: Rng>(&mut self, rng: &mut R, now: u32) {
        self.counter = self.counter.wrapping_add(1);
        self.server_time = now;
        self.client_time = now;
        self.reserved2 = 0;

        self.mouse_moves = rng.gen_range(0..=MAX_BEHAVIOR_COUNT);
        self.mouse_clicks = rng.gen_range(0..=MAX_BEHAVIOR_COUNT);
        self.mouse_scrolls = rng.gen_range(0..=MAX_BEHAVIOR_COUNT);
        self.key_presses = rng.gen_range(0..=MAX_BEHAVIOR_COUNT);
        self.mouse_x = rng.gen_range(0..=SCREEN_WIDTH);
        self.mouse_y = rng.gen_range(0..=SCREEN_HEIGHT);
    }

    /// Serialize into the fixed 43-byte layout, most significant byte first.
    pub fn to_buffer(&self) -> [u8; BUFFER_LEN] {
        let fields: [(u32, usize); 18] = [
            (self.random_id, 4),
            (self.server_time, 4),
            (self.client_time, 4),
            (self.user_agent_hash, 4),
            (self.platform, 1),
            (self.browser_index, 1),
            (self.plugin_count, 1),
            (self.mouse_moves, 3),
            (self.mouse_clicks, 2),
            (self.mouse_scrolls, 2),
            (self.key_presses, 2),
            (self.mouse_x, 2),
            (self.mouse_y, 2),
            (self.browser_feature, 2),
            (self.reserved1, 2),
            (self.reserved2, 4),
            (u32::from(self.counter), 2),
            (self.version, 1),
        ];

        let mut buf = [0u8; BUFFER_LEN];
        let mut offset = 0;
        for (value, width) in fields {
            // Narrow fields keep the low-order bytes of the value.
            let bytes = value.to_be_bytes();
            buf[offset..offset + width].copy_from_slice(&bytes[4 - width..]);
            offset += width;
        }
        buf
    }

    pub fn counter(&self) -> u16 {
        self.counter
    }

    pub fn random_id(&self) -> u32 {
        self.random_id
    }

    pub fn user_agent_hash(&self) -> u32 {
        self.user_agent_hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn fixed_profile() -> DeviceProfile {
        DeviceProfile {
            random_id: 0x0102_0304,
            server_time: 0x0A0B_0C0D,
            client_time: 0x1112_1314,
            user_agent_hash: 0x2122_2324,
            platform: 0,
            browser_index: 11,
            plugin_count: 0,
            mouse_moves: 0x01_0203,
            mouse_clicks: 0x0405,
            mouse_scrolls: 0x0607,
            key_presses: 0x0809,
            mouse_x: 0x0300,
            mouse_y: 0x0200,
            browser_feature: 2848,
            reserved1: 0,
            reserved2: 0,
            counter: 0x0001,
            version: 3,
        }
    }

    #[test]
    fn buffer_layout_is_big_endian_and_fixed_width() {
        let expected: [u8; BUFFER_LEN] = [
            0x01, 0x02, 0x03, 0x04, // random id
            0x0A, 0x0B, 0x0C, 0x0D, // server time
            0x11, 0x12, 0x13, 0x14, // client time
            0x21, 0x22, 0x23, 0x24, // user-agent hash
            0x00, // platform
            0x0B, // browser index
            0x00, // plugin count
            0x01, 0x02, 0x03, // mouse moves
            0x04, 0x05, // mouse clicks
            0x06, 0x07, // mouse scrolls
            0x08, 0x09, // key presses
            0x03, 0x00, // mouse x
            0x02, 0x00, // mouse y
            0x0B, 0x20, // browser feature (2848)
            0x00, 0x00, // reserved1
            0x00, 0x00, 0x00, 0x00, // reserved2
            0x00, 0x01, // counter
            0x03, // version
        ];
        assert_eq!(fixed_profile().to_buffer(), expected);
    }

    #[test]
    fn oversized_values_are_truncated_to_field_width() {
        let mut profile = fixed_profile();
        profile.mouse_moves = 0xAABB_CCDD;
        profile.platform = 0x1FF;
        let buf = profile.to_buffer();
        assert_eq!(buf[16], 0xFF);
        assert_eq!(&buf[19..22], &[0xBB, 0xCC, 0xDD]);
    }

    #[test]
    fn new_profile_uses_fixed_identity_constants() {
        let mut rng = StdRng::seed_from_u64(1);
        let profile = DeviceProfile::new("ab", &mut rng, 1_700_000_000);
        assert_eq!(profile.user_agent_hash(), 97 * 31 + 98);
        assert_eq!(profile.counter(), 0);
        assert_eq!(profile.client_time, 0);
        assert_eq!(profile.server_time, 1_700_000_000);

        let buf = profile.to_buffer();
        assert_eq!(buf[17], 11);
        assert_eq!(&buf[32..34], &[0x0B, 0x20]);
        assert_eq!(buf[42], 3);
    }

    #[test]
    fn refresh_draws_bounded_behavior_and_keeps_identity() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut profile = DeviceProfile::new("agent", &mut rng, 10);
        let random_id = profile.random_id();

        for _ in 0..200 {
            profile.refresh(&mut rng, 20);
            assert!(profile.mouse_moves <= 10_000);
            assert!(profile.mouse_clicks <= 10_000);
            assert!(profile.mouse_scrolls <= 10_000);
            assert!(profile.key_presses <= 10_000);
            assert!(profile.mouse_x <= 1920);
            assert!(profile.mouse_y <= 1080);
        }
        assert_eq!(profile.counter(), 200);
        assert_eq!(profile.random_id(), random_id);
        assert_eq!(profile.server_time, 20);
        assert_eq!(profile.client_time, 20);
    }

    #[test]
    fn counter_wraps_at_sixteen_bits() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut profile = fixed_profile();
        profile.counter = u16::MAX;
        profile.refresh(&mut rng, 0);
        assert_eq!(profile.counter(), 0);
        assert_eq!(&profile.to_buffer()[40..42], &[0x00, 0x00]);
    }
}
