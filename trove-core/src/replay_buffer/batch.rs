//! Transitions and batches of transitions.

/// Column storage for observations or actions.
///
/// A replay buffer keeps one column per field (observations, actions and next
/// observations) and addresses records by slot index. Pushed data is itself a
/// column, typically holding a single record.
///
/// # Examples
///
/// ```ignore
/// struct FloatColumn {
///     data: Vec<f32>,
/// }
///
/// impl BatchBase for FloatColumn {
///     fn new(capacity: usize) -> Self {
///         Self { data: Vec::with_capacity(capacity) }
///     }
///
///     fn push(&mut self, ix: usize, data: Self) {
///         // Write records of `data` starting at `ix`
///     }
///
///     fn sample(&self, ixs: &[usize]) -> Self {
///         Self { data: ixs.iter().map(|&ix| self.data[ix]).collect() }
///     }
///
///     fn len(&self) -> usize {
///         self.data.len()
///     }
/// }
/// ```
pub trait BatchBase {
    /// Creates an empty column able to hold `capacity` records.
    fn new(capacity: usize) -> Self;

    /// Writes the records in `data` starting at slot `ix`.
    ///
    /// Replay buffers only ever write at a slot that is either already filled
    /// or the first empty one.
    fn push(&mut self, ix: usize, data: Self);

    /// Gathers the records at `ixs` into a new column, in the order of `ixs`.
    fn sample(&self, ixs: &[usize]) -> Self;

    /// Number of records held by the column.
    fn len(&self) -> usize;

    /// Returns `true` if the column holds no record.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One element per record, e.g. `vec![0.5f32]` for a scalar observation.
///
/// Records written at `ix == self.len()` are appended, others overwrite in place.
/// Multi-dimensional observations need a column type holding one row per
/// record, such as `NdarrayBatch` in `trove-ndarray`.
impl<T: Clone> BatchBase for Vec<T> {
    fn new(capacity: usize) -> Self {
        Vec::with_capacity(capacity)
    }

    fn push(&mut self, ix: usize, data: Self) {
        for (j, v) in data.into_iter().enumerate() {
            let k = ix + j;
            if k < self.len() {
                self[k] = v;
            } else {
                debug_assert_eq!(k, self.len());
                Vec::push(self, v);
            }
        }
    }

    fn sample(&self, ixs: &[usize]) -> Self {
        ixs.iter().map(|&ix| self[ix].clone()).collect()
    }

    fn len(&self) -> usize {
        Vec::len(self)
    }
}

/// A single transition `(o_t, a_t, r_t, o_t+1, done_t)` pushed into a buffer.
///
/// `obs`, `act` and `next_obs` are columns holding exactly one record. Replay
/// buffers panic on a transition whose columns hold any other number of records.
#[derive(Clone, Debug, PartialEq)]
pub struct Transition<O, A> {
    /// Observation.
    pub obs: O,

    /// Action taken at `obs`.
    pub act: A,

    /// Reward.
    pub reward: f32,

    /// Observation after taking `act`.
    pub next_obs: O,

    /// Whether the episode terminated at this step.
    pub is_done: bool,
}

impl<O, A> Transition<O, A> {
    /// Creates a transition.
    pub fn new(obs: O, act: A, reward: f32, next_obs: O, is_done: bool) -> Self {
        Self {
            obs,
            act,
            reward,
            next_obs,
            is_done,
        }
    }
}

/// A batch of transitions sampled from a replay buffer.
pub struct GenericTransitionBatch<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    /// Observations.
    pub obs: O,

    /// Actions.
    pub act: A,

    /// Next observations.
    pub next_obs: O,

    /// Rewards.
    pub reward: Vec<f32>,

    /// Termination flags, `1` for terminal steps.
    pub is_done: Vec<i8>,

    /// Importance sampling weights, `None` for uniform sampling.
    pub weight: Option<Vec<f32>>,

    /// Slot indices of the sampled transitions.
    pub ix_sample: Option<Vec<usize>>,
}

impl<O, A> GenericTransitionBatch<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    /// Returns the number of transitions in the batch.
    pub fn len(&self) -> usize {
        self.reward.len()
    }

    /// Returns `true` if the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.reward.is_empty()
    }

    /// Decomposes the batch into
    /// `(obs, act, next_obs, reward, is_done, ix_sample, weight)`.
    #[allow(clippy::type_complexity)]
    pub fn unpack(
        self,
    ) -> (
        O,
        A,
        O,
        Vec<f32>,
        Vec<i8>,
        Option<Vec<usize>>,
        Option<Vec<f32>>,
    ) {
        (
            self.obs,
            self.act,
            self.next_obs,
            self.reward,
            self.is_done,
            self.ix_sample,
            self.weight,
        )
    }
}
