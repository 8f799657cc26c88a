// Client fingerprints and user-agent selection
//
// The search body carries a `fingerprint` field. By default it is a random
// 20-digit number drawn once per client; callers that want a value stable
// across runs can derive one from a set of browser traits instead.

use std::fmt;

use rand::Rng;
use rand::seq::SliceRandom;
use sha2::{Digest, Sha256};

use crate::transport::DEFAULT_USER_AGENT;

/// Common desktop browser user agents, used when none is configured.
pub const DESKTOP_USER_AGENTS: &[&str] = &[
    DEFAULT_USER_AGENT,
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
];

/// Pick one of [`DESKTOP_USER_AGENTS`] at random.
pub fn random_user_agent<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    DESKTOP_USER_AGENTS
        .choose(rng)
        .copied()
        .unwrap_or(DEFAULT_USER_AGENT)
}

const NUMERIC_LEN: usize = 20;
const TRAIT_SEPARATOR: &str = "~~~";
const TRAIT_SEED: u32 = 31;

/// Opaque client fingerprint sent in every search request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// 20 decimal digits: the first in `1..=9`, the rest in `0..=8`.
    pub fn numeric<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut digits = String::with_capacity(NUMERIC_LEN);
        digits.push(digit(rng.gen_range(1..=9)));
        for _ in 1..NUMERIC_LEN {
            digits.push(digit(rng.gen_range(0..=8)));
        }
        Self(digits)
    }

    /// Hash the traits and keep the first 32 hex characters.
    pub fn from_traits(traits: &BrowserTraits) -> Self {
        let input = format!("{}_{TRAIT_SEED}", traits.canonical());
        let digest = hex::encode(Sha256::digest(input.as_bytes()));
        Self(digest[..32].to_owned())
    }

    /// Wrap an externally supplied value.
    pub fn from_raw(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn digit(d: u32) -> char {
    char::from_digit(d, 10).unwrap_or('0')
}

/// Browser-like environment description fed to [`Fingerprint::from_traits`].
///
/// Only the canonical string form matters; the field values are not
/// interpreted anywhere else.
#[derive(Debug, Clone, PartialEq)]
pub struct BrowserTraits {
    pub user_agent: String,
    pub language: String,
    pub color_depth: u8,
    pub pixel_ratio: f32,
    pub hardware_concurrency: usize,
    pub resolution: (u32, u32),
    pub timezone_offset_minutes: i32,
    pub platform: String,
    pub cpu_class: String,
    pub plugins: Vec<String>,
    pub fonts: Vec<String>,
}

impl BrowserTraits {
    /// Traits of the current process environment with a desktop browser UA.
    pub fn detect(user_agent: &str) -> Self {
        let offset = chrono::Local::now().offset().local_minus_utc() / 60;
        Self {
            user_agent: user_agent.to_owned(),
            language: std::env::var("LANG")
                .ok()
                .and_then(|l| l.split('.').next().map(|s| s.replace('_', "-")))
                .filter(|l| !l.is_empty() && l != "C" && l != "POSIX")
                .unwrap_or_else(|| "zh-CN".to_owned()),
            color_depth: 24,
            pixel_ratio: 1.0,
            hardware_concurrency: std::thread::available_parallelism().map_or(4, usize::from),
            resolution: (1920, 1080),
            // browsers report minutes *behind* UTC
            timezone_offset_minutes: -offset,
            platform: format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH),
            cpu_class: std::env::consts::ARCH.to_owned(),
            plugins: vec![
                "Chrome PDF Plugin::Portable Document Format::application/x-google-chrome-pdf~pdf".to_owned(),
                "Chrome PDF Viewer::::application/pdf~pdf".to_owned(),
            ],
            fonts: ["Arial", "Courier New", "Georgia", "Tahoma", "Times New Roman", "Verdana"]
                .iter()
                .map(|f| (*f).to_owned())
                .collect(),
        }
    }

    /// Values joined with `~~~`; list values are joined with `;`.
    pub fn canonical(&self) -> String {
        let (width, height) = self.resolution;
        let values = [
            self.user_agent.clone(),
            self.language.clone(),
            self.color_depth.to_string(),
            self.pixel_ratio.to_string(),
            self.hardware_concurrency.to_string(),
            format!("{width};{height}"),
            format!("{width};{}", height.saturating_sub(40)),
            self.timezone_offset_minutes.to_string(),
            self.cpu_class.clone(),
            self.platform.clone(),
            self.plugins.join(";"),
            self.fonts.join(";"),
        ];
        values.join(TRAIT_SEPARATOR)
    }
}
