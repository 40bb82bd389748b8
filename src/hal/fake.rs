//! Scripted GPIO lines for driving the protocols without hardware.
use std::cell::RefCell;
use std::collections::VecDeque;
use std::convert::Infallible;
use std::rc::Rc;

use super::{Line, PinState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Drive(PinState),
    Release,
    Read(PinState),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub line: &'static str,
    pub op: Op,
}

/// Event log shared between the lines of one bus.
pub type Trace = Rc<RefCell<Vec<Event>>>;

pub fn trace() -> Trace {
    Rc::new(RefCell::new(Vec::new()))
}

/// A line whose released level comes from a script of peer replies.
///
/// Once the script runs out the line reads `idle`, which models the
/// pull-up holding a quiet line high.
#[derive(Debug)]
pub struct FakeLine {
    name: &'static str,
    driven: Option<PinState>,
    replies: VecDeque<PinState>,
    idle: PinState,
    trace: Trace,
}

impl FakeLine {
    pub fn new(name: &'static str, trace: &Trace) -> Self {
        FakeLine {
            name,
            driven: None,
            replies: VecDeque::new(),
            idle: PinState::High,
            trace: Rc::clone(trace),
        }
    }

    pub fn with_replies(mut self, replies: impl IntoIterator<Item = PinState>) -> Self {
        self.replies.extend(replies);
        self
    }

    pub fn with_idle(mut self, idle: PinState) -> Self {
        self.idle = idle;
        self
    }

    pub fn is_released(&self) -> bool {
        self.driven.is_none()
    }

    fn record(&self, op: Op) {
        self.trace.borrow_mut().push(Event {
            line: self.name,
            op,
        });
    }
}

impl Line for FakeLine {
    type Error = Infallible;

    fn drive(&mut self, state: PinState) -> Result<(), Self::Error> {
        self.driven = Some(state);
        self.record(Op::Drive(state));
        Ok(())
    }

    fn release(&mut self) -> Result<(), Self::Error> {
        self.driven = None;
        self.record(Op::Release);
        Ok(())
    }

    fn level(&mut self) -> Result<PinState, Self::Error> {
        let level = match self.driven {
            Some(state) => state,
            None => self.replies.pop_front().unwrap_or(self.idle),
        };
        self.record(Op::Read(level));
        Ok(level)
    }
}

/// A line that cannot be driven or read, for error-path tests.
#[derive(Debug, Default)]
pub struct BrokenLine {
    pub released: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineFault;

impl Line for BrokenLine {
    type Error = LineFault;

    fn drive(&mut self, _state: PinState) -> Result<(), Self::Error> {
        self.released = false;
        Err(LineFault)
    }

    fn release(&mut self) -> Result<(), Self::Error> {
        self.released = true;
        Ok(())
    }

    fn level(&mut self) -> Result<PinState, Self::Error> {
        Err(LineFault)
    }
}

/// Expand `(level, count)` runs into one reply per sample.
pub fn levels(runs: &[(PinState, usize)]) -> Vec<PinState> {
    runs.iter()
        .flat_map(|&(level, count)| std::iter::repeat(level).take(count))
        .collect()
}
