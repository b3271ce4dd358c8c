#![no_main]

use std::collections::HashSet;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use modstack_core::{ChainPolicy, DataMap, ModalStack, SequentialIds};
use serde_json::Value;

const NAMES: &[&str] = &["a", "b", "c", "d", "e", "f"];

#[derive(Debug, Arbitrary)]
enum Op {
    Push { name: u8, relay: bool },
    Pop { name: Option<u8>, chain: bool },
    Replace { name: u8, relay: bool },
    Update { key: u8, value: i32 },
}

#[derive(Debug, Arbitrary)]
struct Input {
    close_root: bool,
    ops: Vec<Op>,
}

fn name(index: u8) -> &'static str {
    NAMES[usize::from(index) % NAMES.len()]
}

fuzz_target!(|input: Input| {
    let policy = if input.close_root {
        ChainPolicy::CloseRoot
    } else {
        ChainPolicy::KeepRoot
    };
    let ids = SequentialIds::new();
    let mut stack = ModalStack::new();

    for op in input.ops.iter().take(256) {
        let result = match *op {
            Op::Push { name: n, relay } => stack.push(name(n), None, relay, &ids),
            Op::Pop { name: n, chain } => Ok(stack.pop(n.map(name), chain, policy)),
            Op::Replace { name: n, relay } => stack.replace(name(n), None, relay, policy, &ids),
            Op::Update { key, value } => {
                let mut partial = DataMap::new();
                partial.insert(format!("k{}", key % 8), Value::from(value));
                stack.update(Some(partial), policy, &ids)
            }
        };
        let Ok(transition) = result else {
            continue;
        };

        let next = &transition.stack;
        if transition.is_noop() {
            assert_eq!(next, &stack);
        }
        match *op {
            Op::Pop { chain, .. } if !transition.is_noop() => {
                let base = stack.transaction_base(chain, policy);
                assert_eq!(Some(next.depth()), base);
            }
            Op::Replace { name: n, .. } if !transition.is_noop() => {
                let base = stack.transaction_base(true, policy);
                assert_eq!(base.map(|b| b + 1), Some(next.depth()));
                assert_eq!(next.top().map(|e| e.name.as_str()), Some(name(n)));
            }
            Op::Push { .. } => assert_eq!(next.depth(), stack.depth() + 1),
            _ => {}
        }

        let unique: HashSet<&str> = next.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(unique.len(), next.depth());

        stack = transition.stack;
    }
});
