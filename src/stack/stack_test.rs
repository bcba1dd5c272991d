// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 The tinyvm Authors

//! Tests for the operand stack.

use super::*;
use proptest::prelude::*;

#[test]
fn push_pop_roundtrip() {
    let mut s = OpStack::new();
    s.push(42).unwrap();
    assert_eq!(s.depth(), 1);
    assert_eq!(s.pop().unwrap(), 42);
    assert_eq!(s.depth(), 0);
}

#[test]
fn pop_on_empty_stack_underflows() {
    let mut s = OpStack::new();
    assert_eq!(s.pop().unwrap_err(), StackError::Underflow);
    assert_eq!(s.peek().unwrap_err(), StackError::Underflow);
}

#[test]
fn push_past_capacity_overflows() {
    let mut s = OpStack::new();
    for _ in 0..CAPACITY {
        s.push(0).unwrap();
    }
    assert_eq!(s.push(0).unwrap_err(), StackError::Overflow);
    assert_eq!(s.depth(), CAPACITY);
}

#[test]
fn int_and_float_alias_the_same_storage() {
    let mut s = OpStack::new();
    s.push_f32(1.5).unwrap();
    assert_eq!(s.pop().unwrap(), 1.5f32.to_bits());

    s.push_i32(-1).unwrap();
    assert_eq!(s.pop().unwrap(), u32::MAX);
}

#[test]
fn negative_integers_roundtrip() {
    let mut s = OpStack::new();
    s.push_i32(-12345).unwrap();
    assert_eq!(s.pop_i32().unwrap(), -12345);
}

#[test]
fn peek_does_not_remove() {
    let mut s = OpStack::new();
    s.push(7).unwrap();
    assert_eq!(s.peek().unwrap(), 7);
    assert_eq!(s.depth(), 1);
}

proptest! {
    #[test]
    fn depth_never_exceeds_capacity(words in proptest::collection::vec(any::<u32>(), 0..2000)) {
        let mut s = OpStack::new();
        for w in words {
            let _ = s.push(w);
            prop_assert!(s.depth() <= CAPACITY);
        }
    }

    #[test]
    fn float_roundtrip_is_bit_exact(bits in any::<u32>()) {
        let mut s = OpStack::new();
        let value = f32::from_bits(bits);
        s.push_f32(value).unwrap();
        let popped = s.pop_f32().unwrap();
        prop_assert_eq!(popped.to_bits(), value.to_bits());
    }
}
