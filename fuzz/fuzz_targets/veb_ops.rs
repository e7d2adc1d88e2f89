#![no_main]
use std::collections::BTreeSet;

use libfuzzer_sys::fuzz_target;
use vebmap::{Universe, VebTree};

const LOG_U: u32 = 10;

fuzz_target!(|ops: Vec<(u8, u16)>| {
    let mut tree = VebTree::new(Universe::LogU(LOG_U)).unwrap();
    let mut model: BTreeSet<u64> = BTreeSet::new();

    for (op, raw) in ops {
        let key = u64::from(raw) & ((1 << LOG_U) - 1);
        match op % 4 {
            0 => {
                tree = tree.insert(key).unwrap();
                model.insert(key);
            }
            1 => {
                tree = tree.remove(key);
                model.remove(&key);
            }
            2 => {
                let expected = model.range(key + 1..).next().copied();
                assert_eq!(tree.successor(key), expected);
            }
            _ => {
                let expected = model.range(..key).next_back().copied();
                assert_eq!(tree.predecessor(key), expected);
            }
        }
        assert_eq!(tree.min(), model.first().copied());
        assert_eq!(tree.max(), model.last().copied());
    }

    let walked: Vec<u64> = tree.iter().collect();
    let expected: Vec<u64> = model.iter().copied().collect();
    assert_eq!(walked, expected);
});
