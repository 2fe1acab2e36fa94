use crate::engine::{self, Lanes, MAX_WIDTH};
use crate::pack::{pack_words_with, UnpackedState, LANES, LANE_MASK, WORDS_PER_BATCH};
use crate::LaneSeeding;

/// `2^-24`, scales a lane value into `[0, 1)`.
const LANE_SCALE: f32 = 1.0 / (1u32 << 24) as f32;

/// Lane state of a subtract-with-borrow engine plus its two output cursors.
///
/// Floats are drawn from the current window read as `WIDTH * 24` words in
/// index-major order (window slot `j` of lane `k` at `j * WIDTH + k`). Raw
/// words come from a separately refilled buffer of dense 32-bit words, lane
/// major. Refilling either path moves the window, so the other path's
/// buffered values are discarded.
#[repr(align(32))]
pub(crate) struct State<V: Lanes> {
    x: [V; LANES],
    carry: V,
    skip: u32,
    pos: usize,
    words: [u32; MAX_WIDTH * WORDS_PER_BATCH],
    word_pos: usize,
}

impl<V: Lanes> State<V> {
    pub(crate) const FLAT_LEN: usize = V::WIDTH * LANES;
    pub(crate) const WORDS_LEN: usize = V::WIDTH * WORDS_PER_BATCH;

    #[inline]
    pub(crate) fn new(seed: u32, mode: LaneSeeding, skip: u32) -> Self {
        let (x, carry) = engine::init_engine_state::<V>(seed, mode);

        Self {
            x,
            carry,
            skip,
            pos: Self::FLAT_LEN,
            words: [0; MAX_WIDTH * WORDS_PER_BATCH],
            word_pos: Self::WORDS_LEN,
        }
    }

    /// Reseeds every lane and marks both buffers exhausted.
    #[inline]
    pub(crate) fn reseed(&mut self, seed: u32, mode: LaneSeeding) {
        (self.x, self.carry) = engine::init_engine_state::<V>(seed, mode);
        self.reset_indices();
    }

    #[inline(always)]
    pub(crate) fn skip(&self) -> u32 {
        self.skip
    }

    #[inline]
    pub(crate) fn set_skip(&mut self, skip: u32) {
        self.skip = skip;
        self.reset_indices();
    }

    #[inline(always)]
    fn reset_indices(&mut self) {
        self.pos = Self::FLAT_LEN;
        self.word_pos = Self::WORDS_LEN;
    }

    #[inline(always)]
    fn flat(&self) -> &[u32] {
        // SAFETY: `Lanes` guarantees `V` has the layout of `[u32; WIDTH]`
        unsafe { core::slice::from_raw_parts(self.x.as_ptr() as *const u32, Self::FLAT_LEN) }
    }

    #[inline(always)]
    fn flat_mut(&mut self) -> &mut [u32] {
        // SAFETY: see `flat`
        unsafe { core::slice::from_raw_parts_mut(self.x.as_mut_ptr() as *mut u32, Self::FLAT_LEN) }
    }

    #[inline(always)]
    fn carry_words(&self) -> &[u32] {
        // SAFETY: see `flat`
        unsafe { core::slice::from_raw_parts(&self.carry as *const V as *const u32, V::WIDTH) }
    }

    /// Moves the window one batch (`skip` steps) forward.
    #[inline(always)]
    fn regen(&mut self) {
        engine::advance(&mut self.x, &mut self.carry, self.skip as u64);
    }

    /// Advances every lane by `steps`. The float cursor stays put and keeps
    /// reading the moved window; buffered words are discarded.
    #[inline]
    pub(crate) fn advance(&mut self, steps: u64) {
        if steps == 0 {
            return;
        }

        engine::advance(&mut self.x, &mut self.carry, steps);
        self.word_pos = Self::WORDS_LEN;
    }

    #[inline(always)]
    pub(crate) fn draw_f32(&mut self) -> f32 {
        // sanity check
        debug_assert!(self.pos <= Self::FLAT_LEN);

        if self.pos == Self::FLAT_LEN {
            self.regen();
            self.pos = 0;
            self.word_pos = Self::WORDS_LEN;
        }

        let val = self.flat()[self.pos];
        self.pos += 1;

        val as f32 * LANE_SCALE
    }

    #[inline]
    pub(crate) fn fill(&mut self, out: &mut [f32]) {
        for v in out.iter_mut() {
            *v = self.draw_f32();
        }
    }

    #[inline(always)]
    pub(crate) fn next_word(&mut self) -> u32 {
        debug_assert!(self.word_pos <= Self::WORDS_LEN);

        if self.word_pos == Self::WORDS_LEN {
            self.refill_words();
        }

        let val = self.words[self.word_pos];
        self.word_pos += 1;

        val
    }

    fn refill_words(&mut self) {
        self.regen();

        let mut words = [0u32; MAX_WIDTH * WORDS_PER_BATCH];
        self.export_words(&mut words);

        self.words = words;
        self.word_pos = 0;
        self.pos = Self::FLAT_LEN;
    }

    /// Packs the current window into `WIDTH * 18` words, lane by lane.
    ///
    /// ## Panics
    ///
    /// If `out` holds fewer than `WIDTH * 18` words.
    pub(crate) fn export_words(&self, out: &mut [u32]) -> usize {
        assert!(out.len() >= Self::WORDS_LEN, "export buffer needs {} words", Self::WORDS_LEN);

        let flat = self.flat();

        for (k, chunk) in out[..Self::WORDS_LEN].chunks_exact_mut(WORDS_PER_BATCH).enumerate() {
            pack_words_with(|j| flat[j * V::WIDTH + k], chunk);
        }

        Self::WORDS_LEN
    }

    /// Window and borrow of lane `k`, oldest lane first.
    pub(crate) fn lane_state(&self, k: usize) -> UnpackedState {
        assert!(k < V::WIDTH, "lane {k} out of range for width {}", V::WIDTH);

        let flat = self.flat();
        let lanes = core::array::from_fn(|j| flat[j * V::WIDTH + k]);

        UnpackedState::new(lanes, self.carry_words()[k] != 0)
    }

    /// Overwrites lane `k` and discards buffered output.
    pub(crate) fn load_lane(&mut self, k: usize, s: &UnpackedState) {
        assert!(k < V::WIDTH, "lane {k} out of range for width {}", V::WIDTH);

        let flat = self.flat_mut();

        for (j, &lane) in s.lanes.iter().enumerate() {
            flat[j * V::WIDTH + k] = lane & LANE_MASK;
        }

        let mut c = [0u32; MAX_WIDTH];
        c[..V::WIDTH].copy_from_slice(self.carry_words());
        c[k] = s.carry as u32;

        self.carry = V::from_words(&c[..V::WIDTH]);
        self.reset_indices();
    }
}

impl<V: Lanes> Clone for State<V> {
    fn clone(&self) -> Self {
        Self {
            x: self.x,
            carry: self.carry,
            skip: self.skip,
            pos: self.pos,
            words: self.words,
            word_pos: self.word_pos,
        }
    }
}

#[cfg(test)]
mod state_tests {
    use super::*;
    use crate::engine::portable::Portable;
    use crate::pack::pack_words;
    use crate::seed::seed_state;

    fn scalar(seed: u32) -> State<u32> {
        State::new(seed, LaneSeeding::Independent, 223)
    }

    #[test]
    fn test_first_draw_advances_one_batch() {
        let mut st = scalar(3124);
        let expected = seed_state(3124);

        let mut x = expected.lanes;
        let mut c = expected.carry as u32;
        engine::advance(&mut x, &mut c, 223);

        for j in 0..LANES {
            assert_eq!(st.draw_f32(), x[j] as f32 * LANE_SCALE, "draw {j} is not window slot {j}");
        }
    }

    #[test]
    fn test_draws_lie_in_unit_interval() {
        let mut st = State::<Portable<4>>::new(1, LaneSeeding::Independent, 24);

        for _ in 0..10_000 {
            let v = st.draw_f32();
            assert!((0.0..1.0).contains(&v), "draw {v} escaped [0, 1)");
        }
    }

    #[test]
    fn test_determinism_same_seed() {
        let mut a = State::<Portable<8>>::new(9999, LaneSeeding::Independent, 389);
        let mut b = State::<Portable<8>>::new(9999, LaneSeeding::Independent, 389);

        for _ in 0..1000 {
            assert_eq!(a.draw_f32().to_bits(), b.draw_f32().to_bits(), "same seed must be deterministic");
        }
    }

    #[test]
    fn test_export_is_lane_major() {
        let st = State::<Portable<4>>::new(77, LaneSeeding::Independent, 223);
        let mut out = [0u32; 4 * WORDS_PER_BATCH];

        assert_eq!(st.export_words(&mut out), 72);

        for k in 0..4 {
            let mut lane = [0u32; WORDS_PER_BATCH];
            pack_words(&st.lane_state(k).lanes, &mut lane);

            assert_eq!(&out[k * WORDS_PER_BATCH..(k + 1) * WORDS_PER_BATCH], &lane, "lane {k} block");
        }
    }

    #[test]
    fn test_word_refill_discards_float_batch() {
        let mut st = scalar(5);
        let _ = st.draw_f32();

        let mut twin = st.clone();
        let _ = st.next_word();

        // the float cursor restarts on a fresh window, two batches past the seed
        twin.advance(223);
        let mut w = [0u32; WORDS_PER_BATCH];
        twin.export_words(&mut w);

        assert_eq!(st.next_word(), w[1]);
        assert_eq!(st.lane_state(0), twin.lane_state(0));
    }

    #[test]
    fn test_zero_advance_mid_batch_is_identity() {
        let mut st = scalar(3124);
        let _ = st.draw_f32();

        let mut twin = st.clone();
        twin.advance(0);

        for i in 0..30 {
            assert_eq!(twin.draw_f32().to_bits(), st.draw_f32().to_bits(), "draw {i} after advance(0)");
        }
    }

    #[test]
    fn test_advance_mid_batch_reads_next_slot_of_moved_window() {
        let mut st = scalar(3124);

        for _ in 0..5 {
            let _ = st.draw_f32();
        }

        st.advance(100);
        let window = st.lane_state(0);

        for j in 5..LANES {
            assert_eq!(st.draw_f32(), window.lanes[j] as f32 * LANE_SCALE, "slot {j} of the moved window");
        }

        let mut x = window.lanes;
        let mut c = window.carry as u32;
        engine::advance(&mut x, &mut c, 223);

        assert_eq!(st.draw_f32(), x[0] as f32 * LANE_SCALE, "exhausted window refills");
    }

    #[test]
    fn test_load_lane_round_trips() {
        let mut st = State::<Portable<4>>::new(11, LaneSeeding::Independent, 97);
        let s = seed_state(4242);

        st.load_lane(2, &s);

        assert_eq!(st.lane_state(2), s);
        assert_ne!(st.lane_state(1), s);
    }

    #[test]
    fn test_alignment() {
        assert_eq!(core::mem::align_of::<State<u32>>(), 32);
    }
}
