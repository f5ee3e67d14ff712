// Private commit redaction.
// Replaces identifying fields of private-repository commits with block glyphs.

use std::collections::HashSet;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::record::CommitRecord;

/// Glyphs used to redact private text.
pub const REDACTION_GLYPHS: &[char] = &[
    '░', '▒', '▓', '█', '▄', '▀', '■', '□', '▢', '▣', '▤', '▥', '▦', '▧', '▨', '▩', '▆', '▅',
    '▉', '▇', '▊', '▋', '▌', '_', '▍', '▃', '▂', '▁',
];

/// URL served in place of a private commit's link.
pub const REDACTED_URL: &str = "#";

/// Where to look for replacement glyphs when the input already uses all of
/// `REDACTION_GLYPHS` (start of the Unicode block-elements range).
const FALLBACK_GLYPH_START: char = '\u{2580}';

/// Redacts private commits before they reach the cache.
///
/// Output is random, not reproducible across processes. Tests seed it with
/// [`Obfuscator::with_seed`].
///
/// Ids are the exception: within one process the same commit id always
/// redacts to the same glyphs, so a re-fetched private commit overwrites its
/// cache entry instead of adding a second one.
pub struct Obfuscator {
    rng: Mutex<StdRng>,
    id_key: u64,
}

impl Obfuscator {
    /// Obfuscator seeded from the current time.
    pub fn from_time() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default();
        Self::with_seed(seed)
    }

    /// Obfuscator with a fixed seed.
    pub fn with_seed(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let id_key = rng.r#gen();
        Self {
            rng: Mutex::new(rng),
            id_key,
        }
    }

    /// Redact every private record; public records are returned untouched.
    pub fn obfuscate(&self, records: Vec<CommitRecord>) -> Vec<CommitRecord> {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        records
            .into_iter()
            .map(|record| {
                if record.is_private {
                    let id = self.redact_id(&record.id);
                    redact_record(record, id, &mut *rng)
                } else {
                    record
                }
            })
            .collect()
    }

    /// Redacted id, stable for a given `id` and key. Seeds the glyph choice
    /// from a hash of the id keyed with the per-process secret.
    fn redact_id(&self, id: &str) -> String {
        let mut hasher = DefaultHasher::new();
        self.id_key.hash(&mut hasher);
        id.hash(&mut hasher);
        redact(id, &mut StdRng::seed_from_u64(hasher.finish()))
    }
}

fn redact_record<R: Rng>(record: CommitRecord, id: String, rng: &mut R) -> CommitRecord {
    CommitRecord {
        id,
        repo_name: redact(&record.repo_name, rng),
        message: redact(&record.message, rng),
        timestamp: record.timestamp,
        url: REDACTED_URL.to_string(),
        is_private: true,
    }
}

/// Replace every non-whitespace character with a random glyph that does not
/// occur anywhere in `text`. Whitespace is kept so line breaks survive.
pub fn redact<R: Rng>(text: &str, rng: &mut R) -> String {
    let palette = palette_for(text);
    text.chars()
        .map(|c| {
            if c.is_whitespace() {
                c
            } else {
                palette[rng.gen_range(0..palette.len())]
            }
        })
        .collect()
}

/// Never empty: a char set built from a finite string cannot exhaust the range.
fn palette_for(text: &str) -> Vec<char> {
    let used: HashSet<char> = text.chars().collect();
    let palette: Vec<char> = REDACTION_GLYPHS
        .iter()
        .copied()
        .filter(|g| !used.contains(g))
        .collect();
    if !palette.is_empty() {
        return palette;
    }

    (FALLBACK_GLYPH_START..=char::MAX)
        .find(|c| !c.is_whitespace() && !used.contains(c))
        .into_iter()
        .collect()
}
