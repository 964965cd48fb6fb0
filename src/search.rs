use crate::{BitPair, Command, Error, OpCode, RomCode, Transport};
use alloc::{vec, vec::Vec};
use core::fmt::Debug;
use embedded_hal::delay::DelayNs;
use tracing::{debug, info, trace, warn};

/// Passes tried per branch before it is given up
pub const DEFAULT_ATTEMPTS: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchConfig {
    attempts: u8,
    command: Command,
    family: Option<u8>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            attempts: DEFAULT_ATTEMPTS,
            command: Command::SearchRom,
            family: None,
        }
    }
}

impl SearchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retry budget per branch, at least one pass is always made
    pub fn with_attempts(mut self, attempts: u8) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    pub fn with_command(mut self, command: Command) -> Self {
        self.command = command;
        self
    }

    /// Only look for devices of the given family
    pub fn with_family(mut self, family: u8) -> Self {
        self.family = Some(family);
        self
    }

    pub fn attempts(&self) -> u8 {
        self.attempts
    }

    pub fn command(&self) -> Command {
        self.command
    }

    pub fn family(&self) -> Option<u8> {
        self.family
    }
}

/// A point of the search tree still to be walked
///
/// The lowest `depth` bits of `prefix` are fixed: wherever the bus collides
/// there, the search writes the prefix bit instead of choosing itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Branch {
    prefix: u64,
    depth: u8,
}

impl Branch {
    /// Nothing fixed yet
    pub const ROOT: Branch = Branch {
        prefix: 0,
        depth: 0,
    };

    pub fn new(prefix: u64, depth: u8) -> Self {
        let depth = depth.min(RomCode::BITS);
        let prefix = if depth < RomCode::BITS {
            prefix & ((1 << depth) - 1)
        } else {
            prefix
        };
        Branch { prefix, depth }
    }

    /// Takes the `1` side of a collision at `bit`, `rom` holding the bits
    /// below it
    fn fork(rom: u64, bit: u8) -> Self {
        Branch::new(rom | (1 << bit), bit + 1)
    }

    pub fn prefix(&self) -> u64 {
        self.prefix
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn forced_bit(&self, bit: u8) -> Option<bool> {
        if bit < self.depth {
            Some((self.prefix >> bit) & 0x01 == 0x01)
        } else {
            None
        }
    }
}

/// A branch given up after its retry budget, with the last error seen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchFailure<E: Debug> {
    pub branch: Branch,
    pub error: Error<E>,
}

/// Outcome of a whole search
#[derive(Debug, Clone)]
pub struct SearchReport<E: Debug> {
    devices: Vec<RomCode>,
    failures: Vec<BranchFailure<E>>,
    unexplored: Vec<Branch>,
}

impl<E: Debug> SearchReport<E> {
    /// Accepted ROM codes in discovery order
    pub fn devices(&self) -> &[RomCode] {
        &self.devices
    }

    /// Branches that were given up, the rest of the tree was still searched
    pub fn failures(&self) -> &[BranchFailure<E>] {
        &self.failures
    }

    /// Branches left when the search was stopped early
    pub fn unexplored(&self) -> &[Branch] {
        &self.unexplored
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.unexplored.is_empty()
    }

    pub fn into_devices(self) -> Vec<RomCode> {
        self.devices
    }
}

struct Pass {
    rom: RomCode,
    /// Ascending by bit position
    collisions: Vec<Branch>,
}

/// ROM search state: the branches still to walk and the codes found so far
#[derive(Debug, Clone)]
pub struct RomSearch {
    config: SearchConfig,
    root: Branch,
    pending: Vec<Branch>,
    found: Vec<RomCode>,
}

impl Default for RomSearch {
    fn default() -> Self {
        Self::new(SearchConfig::default())
    }
}

impl RomSearch {
    pub fn new(config: SearchConfig) -> Self {
        let root = match config.family {
            Some(family) => Branch::new(family as u64, 8),
            None => Branch::ROOT,
        };
        RomSearch {
            config,
            root,
            pending: vec![root],
            found: Vec::new(),
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn found(&self) -> &[RomCode] {
        &self.found
    }

    pub fn pending(&self) -> &[Branch] {
        &self.pending
    }

    pub fn is_finished(&self) -> bool {
        self.pending.is_empty()
    }

    /// Walks the next pending branch and returns the device it ends at
    ///
    /// Collisions met on the way become new pending branches. Returns `None`
    /// once the tree is exhausted. Stopping between two calls never leaves
    /// the bus in the middle of a pass.
    pub fn next_device<T: Transport>(
        &mut self,
        transport: &mut T,
        delay: &mut impl DelayNs,
    ) -> Option<Result<RomCode, BranchFailure<T::Error>>> {
        let branch = self.pending.pop()?;
        match self.explore(transport, delay, branch) {
            Ok(rom) => Some(Ok(rom)),
            Err(error) if branch == self.root && self.matches_nothing(&error) => {
                debug!(?error, "no device matches the search condition");
                None
            }
            Err(error) => {
                warn!(
                    prefix = branch.prefix,
                    depth = branch.depth,
                    ?error,
                    "abandoning search branch"
                );
                Some(Err(BranchFailure { branch, error }))
            }
        }
    }

    pub fn into_iter<'a, T: Transport, D: DelayNs>(
        self,
        transport: &'a mut T,
        delay: &'a mut D,
    ) -> RomSearchIter<'a, T, D> {
        RomSearchIter {
            search: self,
            transport,
            delay,
        }
    }

    /// Searches the whole tree
    ///
    /// Failing the first pass fails the search, later branches that fail are
    /// listed in the report.
    pub fn run<T: Transport>(
        self,
        transport: &mut T,
        delay: &mut impl DelayNs,
    ) -> Result<SearchReport<T::Error>, Error<T::Error>> {
        self.run_until(transport, delay, |_| false)
    }

    /// Like [`RomSearch::run`], but stops right after a device for which
    /// `stop` returns `true`
    pub fn run_until<T: Transport>(
        mut self,
        transport: &mut T,
        delay: &mut impl DelayNs,
        mut stop: impl FnMut(&RomCode) -> bool,
    ) -> Result<SearchReport<T::Error>, Error<T::Error>> {
        let mut failures = Vec::new();
        while let Some(result) = self.next_device(transport, delay) {
            match result {
                Ok(rom) => {
                    if stop(&rom) {
                        debug!(pending = self.pending.len(), "search stopped");
                        break;
                    }
                }
                Err(failure) if failure.branch == self.root => return Err(failure.error),
                Err(failure) => failures.push(failure),
            }
        }
        Ok(SearchReport {
            devices: self.found,
            failures,
            unexplored: self.pending,
        })
    }

    fn explore<T: Transport>(
        &mut self,
        transport: &mut T,
        delay: &mut impl DelayNs,
        branch: Branch,
    ) -> Result<RomCode, Error<T::Error>> {
        let pass = self.pass_with_retries(transport, delay, branch)?;
        if self.found.contains(&pass.rom) {
            return Err(Error::DuplicateRom(pass.rom));
        }
        info!(rom = %pass.rom, "found device");
        self.found.push(pass.rom);
        // lowest collision is walked first
        for fork in pass.collisions.into_iter().rev() {
            debug!(prefix = fork.prefix, depth = fork.depth, "queued branch");
            self.pending.push(fork);
        }
        Ok(pass.rom)
    }

    fn matches_nothing<E: Debug>(&self, error: &Error<E>) -> bool {
        match error {
            Error::NoResponse { bit: 0 } => self.config.command == Command::SearchRomAlarmed,
            Error::PathDiverged { bit } => *bit < self.root.depth,
            _ => false,
        }
    }

    fn pass_with_retries<T: Transport>(
        &self,
        transport: &mut T,
        delay: &mut impl DelayNs,
        branch: Branch,
    ) -> Result<Pass, Error<T::Error>> {
        let mut attempt = 1;
        loop {
            match self.pass(transport, delay, branch) {
                Ok(pass) => return Ok(pass),
                Err(error) if attempt < self.config.attempts => {
                    debug!(attempt, ?error, "search pass failed, retrying");
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }

    /// One reset, search command and 64 bit steps down `branch`
    fn pass<T: Transport>(
        &self,
        transport: &mut T,
        delay: &mut impl DelayNs,
        branch: Branch,
    ) -> Result<Pass, Error<T::Error>> {
        if !transport.reset(delay)? {
            return Err(Error::NoPresence);
        }
        transport.write_byte(delay, self.config.command.op_code())?;

        let mut rom = 0_u64;
        let mut collisions = Vec::new();
        for bit in 0..RomCode::BITS {
            let (id_bit, complement) = transport.read_two_bits(delay)?;
            let chosen = match (BitPair::from_slots(id_bit, complement), branch.forced_bit(bit)) {
                (BitPair::NoResponse, _) => return Err(Error::NoResponse { bit }),
                // writing `value` here would follow devices outside this branch
                (BitPair::Forced(value), Some(forced)) if value != forced => {
                    return Err(Error::PathDiverged { bit });
                }
                (BitPair::Forced(value), _) => value,
                (BitPair::Collision, Some(forced)) => forced,
                (BitPair::Collision, None) => {
                    // new path, take the 0 side now and come back for the 1
                    trace!(bit, "collision");
                    collisions.push(Branch::fork(rom, bit));
                    false
                }
            };
            transport.write_bit(delay, chosen)?;
            if chosen {
                rom |= 1 << bit;
            }
        }

        if rom == 0 {
            return Err(Error::AllZeroRom);
        }
        let rom = RomCode::from(rom);
        rom.validate::<T::Error>()?;
        trace!(%rom, collisions = collisions.len(), "search pass done");
        Ok(Pass { rom, collisions })
    }
}

pub struct RomSearchIter<'a, T: Transport, D: DelayNs> {
    search: RomSearch,
    transport: &'a mut T,
    delay: &'a mut D,
}

impl<'a, T: Transport, D: DelayNs> RomSearchIter<'a, T, D> {
    /// Gives back the search state, with what is found and what is left
    pub fn into_search(self) -> RomSearch {
        self.search
    }
}

impl<'a, T: Transport, D: DelayNs> Iterator for RomSearchIter<'a, T, D> {
    type Item = Result<RomCode, BranchFailure<T::Error>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.search
            .next_device(&mut *self.transport, &mut *self.delay)
    }
}

/// Finds every device on the bus with the default configuration
pub fn search_devices<T: Transport>(
    transport: &mut T,
    delay: &mut impl DelayNs,
) -> Result<SearchReport<T::Error>, Error<T::Error>> {
    RomSearch::new(SearchConfig::default()).run(transport, delay)
}
