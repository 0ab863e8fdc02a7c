//! # Shared state channel
//!
//! The channel is a fixed-layout, lock-free memory region shared between the
//! vision producer, the AHRS reader thread and the piloting controller. Each
//! logical entry is one 64-bit atomic word packing the payload (f32 bits in
//! the high half) together with a millisecond timestamp (u32 in the low
//! half), so payload and timestamp always commit as a single atomic unit.
//! Writes use `Release` ordering and reads `Acquire`, making the
//! payload-before-timestamp contract a genuine memory-ordering guarantee.
//!
//! Entries are single-producer: each value is written by exactly one process
//! or thread, and read by any number of consumers. Consumers track freshness
//! through a [`ChanReader`], which remembers the last timestamp it consumed
//! per entry. No cross-entry atomicity is provided - heading may be newer
//! than position or vice versa, and consumers must tolerate the skew.
//!
//! The kill entry is special: any process may write it, every loop polls it
//! at the top of each iteration, and once written it never reads as unset
//! again.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use memmap2::MmapMut;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Maximum number of marks the channel can carry fixes for.
///
/// The region layout is fixed, so the mark slots must be bounded. Eight
/// covers any realistic course.
pub const MAX_MARKS: usize = 8;

/// Number of entries with a fixed (non-mark) slot.
const NUM_FIXED_ENTRIES: usize = 8;

/// Total number of entries in the region.
pub const NUM_ENTRIES: usize = NUM_FIXED_ENTRIES + 2 * MAX_MARKS;

/// Size of the backing region in bytes.
pub const REGION_SIZE: usize = NUM_ENTRIES * std::mem::size_of::<u64>();

// ------------------------------------------------------------------------------------------------
// ENUMERATIONS
// ------------------------------------------------------------------------------------------------

/// The fixed set of entries carried by the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChanEntry {
    /// Cooperative kill signal. Write-once-effective: any write commits to
    /// "killed", it is never reset.
    Kill,

    /// Operator "go" signal releasing the controller from its idle gate.
    Go,

    /// Vehicle heading from the AHRS, compass degrees.
    Heading,

    /// Vehicle roll from the AHRS, degrees.
    Roll,

    /// Vendor-reported AHRS calibration quality bits.
    CalibQuality,

    /// Vehicle marker fix from vision, pixels, x component.
    VisionX,

    /// Vehicle marker fix from vision, pixels, y component.
    VisionY,

    /// Number of waypoint fixes published by vision.
    MarkCount,

    /// Waypoint fix x component, pixels. Index must be below [`MAX_MARKS`].
    MarkX(usize),

    /// Waypoint fix y component, pixels. Index must be below [`MAX_MARKS`].
    MarkY(usize),
}

/// Errors associated with creating or opening a channel.
#[derive(Debug, Error)]
pub enum ChanError {
    #[error("Cannot open the channel backing file: {0}")]
    FileError(std::io::Error),

    #[error("Cannot map the channel backing file: {0}")]
    MapError(std::io::Error),

    #[error("Channel backing file has the wrong size (expected {expected}, found {found})")]
    WrongSize { expected: usize, found: usize },

    #[error("Mark index {0} is beyond the channel's mark capacity ({MAX_MARKS})")]
    MarkIndexOutOfRange(usize),
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// One mapping of the shared state channel.
///
/// Multiple `SharedChannel` instances (in the same process or in different
/// processes) opened on the same backing file observe each other's writes.
pub struct SharedChannel {
    map: MmapMut,
}

/// Per-consumer freshness tracking.
///
/// A reader remembers the last timestamp it consumed for each entry.
/// [`ChanReader::has_new_data`] is the consuming check: it returns true at
/// most once per write.
pub struct ChanReader {
    last_seen: [u32; NUM_ENTRIES],
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl ChanEntry {
    /// Word index of this entry within the region.
    pub fn index(&self) -> usize {
        match *self {
            ChanEntry::Kill => 0,
            ChanEntry::Go => 1,
            ChanEntry::Heading => 2,
            ChanEntry::Roll => 3,
            ChanEntry::CalibQuality => 4,
            ChanEntry::VisionX => 5,
            ChanEntry::VisionY => 6,
            ChanEntry::MarkCount => 7,
            ChanEntry::MarkX(i) => NUM_FIXED_ENTRIES + 2 * i,
            ChanEntry::MarkY(i) => NUM_FIXED_ENTRIES + 2 * i + 1,
        }
    }

    /// Validate a mark-slot entry against the channel capacity.
    pub fn validate(&self) -> Result<(), ChanError> {
        match *self {
            ChanEntry::MarkX(i) | ChanEntry::MarkY(i) if i >= MAX_MARKS => {
                Err(ChanError::MarkIndexOutOfRange(i))
            }
            _ => Ok(()),
        }
    }
}

impl SharedChannel {
    /// Create a fresh channel at the given path.
    ///
    /// The backing file is created (or truncated) and zeroed, so all entries
    /// start in the "never written" state. Called once per run, by the
    /// orchestrator, before any producer or consumer opens the region.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, ChanError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)
            .map_err(ChanError::FileError)?;

        file.set_len(REGION_SIZE as u64)
            .map_err(ChanError::FileError)?;

        let map = unsafe { MmapMut::map_mut(&file) }.map_err(ChanError::MapError)?;

        let chan = Self { map };

        // Zero every word so no stale timestamps survive a previous run
        for i in 0..NUM_ENTRIES {
            chan.word_at(i).store(0, Ordering::Release);
        }

        Ok(chan)
    }

    /// Open an existing channel at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ChanError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(ChanError::FileError)?;

        let len = file.metadata().map_err(ChanError::FileError)?.len() as usize;

        if len != REGION_SIZE {
            return Err(ChanError::WrongSize {
                expected: REGION_SIZE,
                found: len,
            });
        }

        let map = unsafe { MmapMut::map_mut(&file) }.map_err(ChanError::MapError)?;

        Ok(Self { map })
    }

    /// Write a payload into an entry, stamping it with the current time.
    ///
    /// The payload and timestamp commit as one atomic word, so a consumer
    /// that observes the new timestamp is guaranteed to observe the new
    /// payload. Per-entry timestamps are strictly monotonic: two writes
    /// within the same millisecond still produce distinct stamps, so no
    /// write is invisible to a reader.
    pub fn write(&self, entry: ChanEntry, payload: f32) {
        let prev = self.word(entry).load(Ordering::Acquire) as u32;
        let ts = now_ms().max(prev.wrapping_add(1));
        let word = ((payload.to_bits() as u64) << 32) | ts as u64;
        self.word(entry).store(word, Ordering::Release);
    }

    /// Read an entry's payload and timestamp.
    ///
    /// Returns `None` if the entry has never been written.
    pub fn read(&self, entry: ChanEntry) -> Option<(f32, u32)> {
        let word = self.word(entry).load(Ordering::Acquire);
        let ts = word as u32;

        if ts == 0 {
            None
        } else {
            Some((f32::from_bits((word >> 32) as u32), ts))
        }
    }

    /// Read an entry's timestamp, `0` meaning never written.
    pub fn timestamp(&self, entry: ChanEntry) -> u32 {
        self.word(entry).load(Ordering::Acquire) as u32
    }

    /// Age of an entry's last write in milliseconds, or `None` if never
    /// written.
    pub fn age_ms(&self, entry: ChanEntry) -> Option<u32> {
        let ts = self.timestamp(entry);

        if ts == 0 {
            None
        } else {
            Some(now_ms().wrapping_sub(ts))
        }
    }

    /// Commit the kill signal. Never reversed.
    pub fn write_kill(&self) {
        self.write(ChanEntry::Kill, 1.0);
    }

    /// True once any process has written the kill entry.
    pub fn is_killed(&self) -> bool {
        self.timestamp(ChanEntry::Kill) != 0
    }

    /// Commit the operator go signal.
    pub fn write_go(&self) {
        self.write(ChanEntry::Go, 1.0);
    }

    /// True once the operator go signal has been written.
    pub fn is_go(&self) -> bool {
        self.timestamp(ChanEntry::Go) != 0
    }

    /// Get the atomic word backing an entry.
    ///
    /// # Panics
    /// - Panics if the entry's mark index is beyond [`MAX_MARKS`]. That is a
    ///   programming error, and must never turn into an access past the
    ///   mapping.
    fn word(&self, entry: ChanEntry) -> &AtomicU64 {
        if let Err(e) = entry.validate() {
            panic!("{}", e);
        }

        self.word_at(entry.index())
    }

    fn word_at(&self, index: usize) -> &AtomicU64 {
        assert!(index < NUM_ENTRIES);

        // The mapping is page aligned and sized to NUM_ENTRIES words, and
        // AtomicU64 permits mutation through a shared reference, so viewing
        // the region as atomic words is sound.
        unsafe { &*(self.map.as_ptr() as *const AtomicU64).add(index) }
    }
}

impl ChanReader {
    pub fn new() -> Self {
        Self {
            last_seen: [0; NUM_ENTRIES],
        }
    }

    /// Non-consuming freshness check.
    ///
    /// True if the entry carries a timestamp this reader has not consumed
    /// yet. Used to peek at a group of entries before committing to consume
    /// any of them.
    pub fn is_fresh(&self, chan: &SharedChannel, entry: ChanEntry) -> bool {
        let ts = chan.timestamp(entry);
        ts != 0 && ts != self.last_seen[entry.index()]
    }

    /// Consuming freshness check.
    ///
    /// Returns true if the entry carries a timestamp newer than the last one
    /// this reader consumed, and advances the reader past it. An immediate
    /// second call with no intervening write returns false.
    pub fn has_new_data(&mut self, chan: &SharedChannel, entry: ChanEntry) -> bool {
        let ts = chan.timestamp(entry);

        if ts != 0 && ts != self.last_seen[entry.index()] {
            self.last_seen[entry.index()] = ts;
            true
        } else {
            false
        }
    }

    /// Consume an entry: returns the payload if it is fresh for this reader,
    /// `None` otherwise.
    pub fn take(&mut self, chan: &SharedChannel, entry: ChanEntry) -> Option<f32> {
        if self.has_new_data(chan, entry) {
            chan.read(entry).map(|(payload, _)| payload)
        } else {
            None
        }
    }
}

impl Default for ChanReader {
    fn default() -> Self {
        Self::new()
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Current wall-clock time in milliseconds, truncated to 32 bits.
///
/// Zero is reserved for "never written", so the clock is clamped away from
/// it. Wrap after ~49 days is tolerated: comparisons are only meaningful
/// within a run.
pub fn now_ms() -> u32 {
    let ms = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u32)
        .unwrap_or(1);

    ms.max(1)
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::path::PathBuf;

    /// Unique backing file path for one test.
    fn test_chan_path(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("regatta_chan_test_{}_{}", name, std::process::id()));
        path
    }

    #[test]
    fn test_entry_indices_unique() {
        let mut seen = vec![false; NUM_ENTRIES];

        let mut entries = vec![
            ChanEntry::Kill,
            ChanEntry::Go,
            ChanEntry::Heading,
            ChanEntry::Roll,
            ChanEntry::CalibQuality,
            ChanEntry::VisionX,
            ChanEntry::VisionY,
            ChanEntry::MarkCount,
        ];
        for i in 0..MAX_MARKS {
            entries.push(ChanEntry::MarkX(i));
            entries.push(ChanEntry::MarkY(i));
        }

        for entry in entries {
            let index = entry.index();
            assert!(index < NUM_ENTRIES);
            assert!(!seen[index], "duplicate index for {:?}", entry);
            seen[index] = true;
        }
    }

    #[test]
    fn test_read_before_write_is_none() {
        let path = test_chan_path("unwritten");
        let chan = SharedChannel::create(&path).unwrap();

        assert!(chan.read(ChanEntry::Heading).is_none());
        assert!(chan.age_ms(ChanEntry::Heading).is_none());

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_write_read_round_trip() {
        let path = test_chan_path("round_trip");
        let chan = SharedChannel::create(&path).unwrap();

        chan.write(ChanEntry::Heading, 273.5);
        let (payload, ts) = chan.read(ChanEntry::Heading).unwrap();

        assert_eq!(payload, 273.5);
        assert_ne!(ts, 0);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_freshness_true_then_false() {
        let path = test_chan_path("freshness");
        let chan = SharedChannel::create(&path).unwrap();
        let mut reader = ChanReader::new();

        assert!(!reader.has_new_data(&chan, ChanEntry::VisionX));

        chan.write(ChanEntry::VisionX, 12.0);

        assert!(reader.has_new_data(&chan, ChanEntry::VisionX));
        // No intervening write, so the second check must be false
        assert!(!reader.has_new_data(&chan, ChanEntry::VisionX));

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_take_consumes() {
        let path = test_chan_path("take");
        let chan = SharedChannel::create(&path).unwrap();
        let mut reader = ChanReader::new();

        chan.write(ChanEntry::Roll, -3.25);

        assert_eq!(reader.take(&chan, ChanEntry::Roll), Some(-3.25));
        assert_eq!(reader.take(&chan, ChanEntry::Roll), None);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_kill_latches() {
        let path = test_chan_path("kill");
        let chan = SharedChannel::create(&path).unwrap();

        assert!(!chan.is_killed());

        chan.write_kill();
        assert!(chan.is_killed());

        // A second write must not unset it
        chan.write_kill();
        assert!(chan.is_killed());

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_kill_visible_across_mappings() {
        let path = test_chan_path("cross_map");
        let writer = SharedChannel::create(&path).unwrap();
        let reader = SharedChannel::open(&path).unwrap();

        assert!(!reader.is_killed());

        writer.write_kill();
        assert!(reader.is_killed());

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_independent_readers() {
        let path = test_chan_path("readers");
        let chan = SharedChannel::create(&path).unwrap();
        let mut reader_a = ChanReader::new();
        let mut reader_b = ChanReader::new();

        chan.write(ChanEntry::Heading, 90.0);

        // Consuming with one reader must not starve the other
        assert!(reader_a.has_new_data(&chan, ChanEntry::Heading));
        assert!(reader_b.has_new_data(&chan, ChanEntry::Heading));

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_mark_index_validation() {
        assert!(ChanEntry::MarkX(0).validate().is_ok());
        assert!(ChanEntry::MarkY(MAX_MARKS - 1).validate().is_ok());
        assert!(ChanEntry::MarkX(MAX_MARKS).validate().is_err());
    }

    #[test]
    #[should_panic(expected = "beyond the channel's mark capacity")]
    fn test_out_of_range_mark_write_panics() {
        let path = test_chan_path("oob_write");
        let chan = SharedChannel::create(&path).unwrap();
        std::fs::remove_file(&path).ok();

        // One word past the region; must never reach the pointer arithmetic
        chan.write(ChanEntry::MarkX(MAX_MARKS), 42.0);
    }

    #[test]
    #[should_panic(expected = "beyond the channel's mark capacity")]
    fn test_out_of_range_mark_read_panics() {
        let path = test_chan_path("oob_read");
        let chan = SharedChannel::create(&path).unwrap();
        std::fs::remove_file(&path).ok();

        chan.read(ChanEntry::MarkY(MAX_MARKS));
    }

    #[test]
    fn test_is_fresh_does_not_consume() {
        let path = test_chan_path("peek");
        let chan = SharedChannel::create(&path).unwrap();
        let mut reader = ChanReader::new();

        assert!(!reader.is_fresh(&chan, ChanEntry::VisionX));

        chan.write(ChanEntry::VisionX, 7.0);

        // Peeking any number of times leaves the entry unconsumed
        assert!(reader.is_fresh(&chan, ChanEntry::VisionX));
        assert!(reader.is_fresh(&chan, ChanEntry::VisionX));

        assert!(reader.has_new_data(&chan, ChanEntry::VisionX));
        assert!(!reader.is_fresh(&chan, ChanEntry::VisionX));

        std::fs::remove_file(path).ok();
    }

    /// Child side of the cross-process kill test. A no-op unless the parent
    /// has set the path variable.
    #[test]
    fn kill_writer_child_proc() {
        if let Ok(path) = std::env::var("REGATTA_CHAN_CHILD_KILL_PATH") {
            let chan = SharedChannel::open(path).unwrap();
            chan.write_kill();
        }
    }

    #[test]
    fn test_kill_visible_across_processes() {
        let path = test_chan_path("cross_proc");
        let chan = SharedChannel::create(&path).unwrap();

        assert!(!chan.is_killed());

        // Re-run this test binary in a child process, filtered down to the
        // writer above, with a second mapping of the same backing file
        let status = std::process::Command::new(std::env::current_exe().unwrap())
            .args(["--exact", "chan::test::kill_writer_child_proc"])
            .env("REGATTA_CHAN_CHILD_KILL_PATH", &path)
            .status()
            .unwrap();

        assert!(status.success());
        assert!(chan.is_killed());

        std::fs::remove_file(path).ok();
    }
}
