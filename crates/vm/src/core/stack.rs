use alloy::primitives::U256;

use super::{
    constants::{RETURN_STACK_LIMIT, STACK_LIMIT},
    errors::VmError,
};

/// The [`Stack`] struct represents the operand stack of a call frame.
///
/// It is a LIFO structure of 256-bit words, bounded at [`STACK_LIMIT`] entries. The interpreter
/// validates the stack depth against the instruction's requirements before executing it, so the
/// accessors below only fail when an instruction is used outside the interpreter.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Stack {
    data: Vec<U256>,
}

impl Stack {
    /// Creates a new [`Stack`].
    ///
    /// ```
    /// use cvm_vm::core::stack::Stack;
    ///
    /// let stack = Stack::new();
    /// assert_eq!(stack.len(), 0);
    /// ```
    pub fn new() -> Stack {
        Stack { data: Vec::with_capacity(STACK_LIMIT) }
    }

    /// Push a value onto the stack.
    ///
    /// ```
    /// use cvm_vm::core::stack::Stack;
    /// use alloy::primitives::U256;
    ///
    /// let mut stack = Stack::new();
    /// stack.push(U256::from(0x00));
    /// assert_eq!(stack.len(), 1);
    /// ```
    #[inline]
    pub fn push(&mut self, value: U256) {
        self.data.push(value);
    }

    /// Pop a value off the stack.
    ///
    /// ```
    /// use cvm_vm::core::stack::Stack;
    /// use alloy::primitives::U256;
    ///
    /// let mut stack = Stack::new();
    /// stack.push(U256::from(0x01));
    /// assert_eq!(stack.pop().unwrap(), U256::from(0x01));
    /// assert!(stack.pop().is_err());
    /// ```
    #[inline]
    pub fn pop(&mut self) -> Result<U256, VmError> {
        self.data.pop().ok_or(VmError::StackUnderflow { len: 0, required: 1 })
    }

    /// Returns a mutable reference to the top of the stack.
    #[inline]
    pub fn peek_mut(&mut self) -> Result<&mut U256, VmError> {
        self.data.last_mut().ok_or(VmError::StackUnderflow { len: 0, required: 1 })
    }

    /// Returns the `n`th value from the top of the stack, where `back(0)` is the top.
    ///
    /// ```
    /// use cvm_vm::core::stack::Stack;
    /// use alloy::primitives::U256;
    ///
    /// let mut stack = Stack::new();
    /// stack.push(U256::from(0x01));
    /// stack.push(U256::from(0x02));
    /// assert_eq!(stack.back(0).unwrap(), U256::from(0x02));
    /// assert_eq!(stack.back(1).unwrap(), U256::from(0x01));
    /// ```
    #[inline]
    pub fn back(&self, n: usize) -> Result<U256, VmError> {
        let len = self.data.len();
        if n >= len {
            return Err(VmError::StackUnderflow { len, required: n + 1 });
        }
        Ok(self.data[len - 1 - n])
    }

    /// Swap the top value with the value `n` positions below it.
    ///
    /// ```
    /// use cvm_vm::core::stack::Stack;
    /// use alloy::primitives::U256;
    ///
    /// let mut stack = Stack::new();
    /// stack.push(U256::from(0x00));
    /// stack.push(U256::from(0x01));
    /// stack.push(U256::from(0x02));
    ///
    /// // SWAP2
    /// stack.swap(2).unwrap();
    /// assert_eq!(stack.back(0).unwrap(), U256::from(0x00));
    /// assert_eq!(stack.back(2).unwrap(), U256::from(0x02));
    /// ```
    #[inline]
    pub fn swap(&mut self, n: usize) -> Result<(), VmError> {
        let len = self.data.len();
        if n >= len {
            return Err(VmError::StackUnderflow { len, required: n + 1 });
        }
        self.data.swap(len - 1, len - 1 - n);
        Ok(())
    }

    /// Duplicate the `n`th value from the top (1-based, as in DUP1..DUP16) onto the top.
    ///
    /// ```
    /// use cvm_vm::core::stack::Stack;
    /// use alloy::primitives::U256;
    ///
    /// let mut stack = Stack::new();
    /// stack.push(U256::from(0x07));
    /// stack.push(U256::from(0x08));
    ///
    /// // DUP2
    /// stack.dup(2).unwrap();
    /// assert_eq!(stack.back(0).unwrap(), U256::from(0x07));
    /// assert_eq!(stack.len(), 3);
    /// ```
    #[inline]
    pub fn dup(&mut self, n: usize) -> Result<(), VmError> {
        let value = self.back(n - 1)?;
        self.data.push(value);
        Ok(())
    }

    /// The number of items on the stack.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the stack is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The stack contents, bottom first.
    pub fn data(&self) -> &[U256] {
        &self.data
    }
}

/// The [`ReturnStack`] holds the return program counters of JUMPSUB, bounded at
/// [`RETURN_STACK_LIMIT`] entries.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct ReturnStack {
    data: Vec<u32>,
}

impl ReturnStack {
    /// Creates an empty [`ReturnStack`].
    pub fn new() -> ReturnStack {
        ReturnStack { data: Vec::with_capacity(RETURN_STACK_LIMIT) }
    }

    /// Push a return location.
    pub fn push(&mut self, pc: u32) {
        self.data.push(pc);
    }

    /// Pop the most recent return location.
    pub fn pop(&mut self) -> Option<u32> {
        self.data.pop()
    }

    /// The number of return locations held.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether no subroutine is active.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The return locations, oldest first.
    pub fn data(&self) -> &[u32] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_pop() {
        let mut stack = Stack::new();
        stack.push(U256::from(1));
        stack.push(U256::from(2));

        assert_eq!(stack.pop(), Ok(U256::from(2)));
        assert_eq!(stack.pop(), Ok(U256::from(1)));
        assert_eq!(stack.pop(), Err(VmError::StackUnderflow { len: 0, required: 1 }));
    }

    #[test]
    fn test_swap() {
        let mut stack = Stack::new();
        for i in 0..17u64 {
            stack.push(U256::from(i));
        }

        // SWAP16
        stack.swap(16).expect("enough items");
        assert_eq!(stack.back(0), Ok(U256::from(0)));
        assert_eq!(stack.back(16), Ok(U256::from(16)));
        assert!(stack.swap(17).is_err());
    }

    #[test]
    fn test_dup() {
        let mut stack = Stack::new();
        stack.push(U256::from(0xaa));
        stack.dup(1).expect("enough items");

        assert_eq!(stack.data(), &[U256::from(0xaa), U256::from(0xaa)]);
        assert!(stack.dup(3).is_err());
    }

    #[test]
    fn test_peek_mut() {
        let mut stack = Stack::new();
        stack.push(U256::from(5));
        *stack.peek_mut().expect("non-empty") += U256::from(1);

        assert_eq!(stack.back(0), Ok(U256::from(6)));
    }

    #[test]
    fn test_return_stack() {
        let mut rstack = ReturnStack::new();
        assert!(rstack.is_empty());

        rstack.push(4);
        rstack.push(9);
        assert_eq!(rstack.len(), 2);
        assert_eq!(rstack.pop(), Some(9));
        assert_eq!(rstack.data(), &[4]);
    }
}
