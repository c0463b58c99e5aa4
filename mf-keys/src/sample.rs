//! Raw key samples
//!
//! The producer side runs at a fixed rate (a timer interrupt on the device,
//! about 1kHz) and drops one scan word per tick into a ring buffer.  The
//! consumer side only ever looks at the whole window, which is reduced to a
//! stable state by the [`Debouncer`](crate::debounce::Debouncer).
//!
//! [`KeySamples`] holds the grid and expansion port rings behind a
//! critical section, so a tick can never land in the middle of the consumer
//! copying out a window.

use core::cell::RefCell;
use core::fmt::Debug;
use core::ops::{BitAnd, BitXor, Not};

use critical_section::Mutex;

/// Depth of the sample window.  At a 1ms tick this is a 10ms press delay.
pub const WINDOW: usize = 10;

/// A raw reading of a group of keys, one bit per key.
pub trait ScanWord:
    Copy + Eq + Default + Debug + BitAnd<Output = Self> + BitXor<Output = Self> + Not<Output = Self>
{
    /// No keys.
    const NONE: Self;
    /// Every key.
    const ALL: Self;
}

impl ScanWord for u16 {
    const NONE: Self = 0;
    const ALL: Self = 0xffff;
}

impl ScanWord for u8 {
    const NONE: Self = 0;
    const ALL: Self = 0xff;
}

/// Something that can be asked for a raw reading of the keys.  On the device
/// this is the shift register chain, on the host it might be a recording.
pub trait ScanSource {
    /// Read the grid, and the expansion port pins.
    fn scan(&mut self) -> (u16, u8);
}

/// Fixed depth ring of the most recent samples.
#[derive(Clone, Debug)]
pub struct SampleBuffer<W, const N: usize = WINDOW> {
    slots: [W; N],
    /// Where the next sample will be written.
    pos: usize,
}

impl<W: ScanWord, const N: usize> SampleBuffer<W, N> {
    /// A buffer with every slot released.
    pub const fn new() -> Self {
        SampleBuffer {
            slots: [W::NONE; N],
            pos: 0,
        }
    }

    /// Overwrite the oldest sample.
    pub fn push(&mut self, word: W) {
        self.slots[self.pos] = word;
        self.pos = (self.pos + 1) % N;
    }

    /// The window, in slot order (not time order, which doesn't matter for
    /// the debouncer).
    pub fn window(&self) -> &[W; N] {
        &self.slots
    }
}

impl<W: ScanWord, const N: usize> Default for SampleBuffer<W, N> {
    fn default() -> Self {
        Self::new()
    }
}

struct Rings<const N: usize> {
    grid: SampleBuffer<u16, N>,
    expansion: SampleBuffer<u8, N>,
    ticks: u32,
}

/// The sample rings shared between the sampler and the polling loop.
///
/// There is to be exactly one writer (calling [`tick`](Self::tick) or
/// [`sample`](Self::sample)) and one reader (calling
/// [`windows`](Self::windows)).
pub struct KeySamples<const N: usize = WINDOW> {
    inner: Mutex<RefCell<Rings<N>>>,
}

impl<const N: usize> KeySamples<N> {
    pub const fn new() -> Self {
        KeySamples {
            inner: Mutex::new(RefCell::new(Rings {
                grid: SampleBuffer::new(),
                expansion: SampleBuffer::new(),
                ticks: 0,
            })),
        }
    }

    /// Record one raw reading.  This is the producer entry point.
    pub fn sample(&self, grid: u16, expansion: u8) {
        critical_section::with(|cs| {
            let mut rings = self.inner.borrow_ref_mut(cs);
            rings.grid.push(grid);
            rings.expansion.push(expansion & 0x0f);
            rings.ticks = rings.ticks.wrapping_add(1);
        });
    }

    /// Read from the source, and record it.
    pub fn tick<S: ScanSource + ?Sized>(&self, source: &mut S) {
        let (grid, expansion) = source.scan();
        self.sample(grid, expansion);
    }

    /// Copy out both windows.  The copy is taken with the producer locked
    /// out, so the two windows always come from the same set of ticks.
    pub fn windows(&self) -> ([u16; N], [u8; N]) {
        critical_section::with(|cs| {
            let rings = self.inner.borrow_ref(cs);
            (*rings.grid.window(), *rings.expansion.window())
        })
    }

    /// Number of samples taken so far (wrapping).
    pub fn ticks(&self) -> u32 {
        critical_section::with(|cs| self.inner.borrow_ref(cs).ticks)
    }
}

impl<const N: usize> Default for KeySamples<N> {
    fn default() -> Self {
        Self::new()
    }
}
