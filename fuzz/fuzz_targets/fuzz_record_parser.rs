// SPDX-License-Identifier: PMPL-1.0-or-later
// Fuzz target for splitting log file images into records

#![no_main]

use comlog_core::{MetadataLayout, RecordIter};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    for layout in [MetadataLayout::KeyAndLength, MetadataLayout::LengthOnly, MetadataLayout::Raw] {
        let mut consumed = 0;
        let mut records = RecordIter::new(data, layout, "fuzz");
        for record in records.by_ref() {
            match record {
                Ok(payload) => consumed += payload.len() + layout.size() as usize,
                Err(_) => break,
            }
        }

        // Parsing stops on the first error and never reads past the input.
        assert!(consumed <= data.len());
        assert!(records.next().is_none());
    }
});
