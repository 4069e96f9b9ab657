//! Call frames holding local variables.

use neon_core::Cell;

use crate::error::VmError;

/// Local variable slots of one active call.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    locals: Vec<Cell>,
    /// Unique per push; addresses into this frame carry it.
    serial: u64,
    /// Stack indices of the lexically enclosing frames, outermost first,
    /// ending with this frame.
    scope: Vec<usize>,
}

impl Frame {
    pub fn new(size: usize) -> Self {
        Frame {
            locals: vec![Cell::Nothing; size],
            ..Frame::default()
        }
    }

    pub fn serial(&self) -> u64 {
        self.serial
    }

    pub fn len(&self) -> usize {
        self.locals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locals.is_empty()
    }

    pub fn local(&self, slot: usize) -> Option<&Cell> {
        self.locals.get(slot)
    }

    pub fn local_mut(&mut self, slot: usize) -> Option<&mut Cell> {
        self.locals.get_mut(slot)
    }
}

#[derive(Debug)]
pub struct FrameStack {
    frames: Vec<Frame>,
    capacity: usize,
    next_serial: u64,
}

impl FrameStack {
    pub fn new(capacity: usize) -> Self {
        FrameStack {
            frames: Vec::new(),
            capacity,
            next_serial: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Push `frame` for a function at lexical depth `nest` (1 for a
    /// top-level function). Its scope keeps the first `nest - 1` enclosing
    /// frames of the caller's scope.
    pub fn push(&mut self, nest: usize, mut frame: Frame) -> Result<(), VmError> {
        if self.frames.len() >= self.capacity {
            return Err(VmError::FrameStackOverflow(self.capacity));
        }
        let mut scope = self
            .frames
            .last()
            .map(|top| top.scope.clone())
            .unwrap_or_default();
        scope.truncate(nest.saturating_sub(1));
        scope.push(self.frames.len());
        frame.scope = scope;
        frame.serial = self.next_serial;
        self.next_serial += 1;
        self.frames.push(frame);
        Ok(())
    }

    /// Pop the top frame; its locals are dropped with it.
    pub fn pop(&mut self) -> Result<Frame, VmError> {
        self.frames.pop().ok_or(VmError::FrameStackUnderflow)
    }

    pub fn get(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Frame> {
        self.frames.get_mut(index)
    }

    /// Index of the frame `back` lexical levels out from the top frame.
    pub fn enclosing(&self, back: usize) -> Option<usize> {
        let scope = &self.frames.last()?.scope;
        let at = scope.len().checked_sub(back + 1)?;
        scope.get(at).copied()
    }

    pub fn truncate(&mut self, len: usize) {
        self.frames.truncate(len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neon_core::Number;

    #[test]
    fn frames_start_with_nothing() {
        let f = Frame::new(3);
        assert_eq!(f.len(), 3);
        assert!(f.local(2).unwrap().is_nothing());
        assert!(f.local(3).is_none());
    }

    #[test]
    fn depth_limit_and_underflow() {
        let mut fs = FrameStack::new(2);
        fs.push(1, Frame::new(1)).unwrap();
        fs.push(1, Frame::new(1)).unwrap();
        assert!(matches!(
            fs.push(1, Frame::new(1)),
            Err(VmError::FrameStackOverflow(2))
        ));
        fs.pop().unwrap();
        fs.pop().unwrap();
        assert!(matches!(fs.pop(), Err(VmError::FrameStackUnderflow)));
    }

    #[test]
    fn enclosing_follows_lexical_nesting() {
        let mut fs = FrameStack::new(8);
        // f (nest 1) calls g (nest 2), which calls its sibling h (nest 2)
        fs.push(1, Frame::new(1)).unwrap();
        fs.push(2, Frame::new(1)).unwrap();
        assert_eq!(fs.enclosing(0), Some(1));
        assert_eq!(fs.enclosing(1), Some(0));
        fs.push(2, Frame::new(1)).unwrap();
        assert_eq!(fs.enclosing(0), Some(2));
        assert_eq!(fs.enclosing(1), Some(0));
        assert_eq!(fs.enclosing(2), None);
        *fs.get_mut(0).unwrap().local_mut(0).unwrap() = Cell::from_number(Number::from(4));
        assert_eq!(
            fs.get(fs.enclosing(1).unwrap()).unwrap().local(0),
            Some(&Cell::from_number(Number::from(4)))
        );
    }

    #[test]
    fn recursion_in_nested_function_keeps_outer_scope() {
        let mut fs = FrameStack::new(8);
        fs.push(1, Frame::new(1)).unwrap();
        fs.push(2, Frame::new(1)).unwrap();
        fs.push(2, Frame::new(1)).unwrap();
        fs.push(2, Frame::new(1)).unwrap();
        assert_eq!(fs.enclosing(1), Some(0));
        fs.pop().unwrap();
        assert_eq!(fs.enclosing(0), Some(2));
        assert_eq!(fs.enclosing(1), Some(0));
    }

    #[test]
    fn every_push_gets_a_new_serial() {
        let mut fs = FrameStack::new(4);
        fs.push(1, Frame::new(1)).unwrap();
        let first = fs.get(0).unwrap().serial();
        fs.pop().unwrap();
        fs.push(1, Frame::new(1)).unwrap();
        assert_ne!(fs.get(0).unwrap().serial(), first);
    }
}
