// dhcpcd-tray - Scan Processing
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Cleanup of raw scan results.
//!
//! Supplicants report every beacon they heard: hidden networks with no
//! SSID, and the same SSID once per access point. The menu wants one
//! entry per network, strongest signal first, in name order.

use std::cmp::Ordering;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::models::ScanRecord;

/// Drop hidden networks, keep the strongest record per SSID and sort by
/// SSID ignoring ASCII case.
///
/// Among records with equal SSID and equal strength the earliest one wins.
pub fn process_scans(records: Vec<ScanRecord>) -> Vec<ScanRecord> {
    let survivors = strongest_per_ssid(records);
    merge_sort_by(survivors, |a, b| cmp_ignore_ascii_case(&a.ssid, &b.ssid))
}

fn strongest_per_ssid(records: Vec<ScanRecord>) -> Vec<ScanRecord> {
    let mut keep = vec![false; records.len()];
    {
        let mut best: HashMap<&str, usize> = HashMap::new();
        for (index, record) in records.iter().enumerate() {
            if record.ssid.is_empty() {
                continue;
            }
            match best.entry(record.ssid.as_str()) {
                Entry::Vacant(slot) => {
                    slot.insert(index);
                }
                Entry::Occupied(mut slot) => {
                    if records[*slot.get()].strength < record.strength {
                        slot.insert(index);
                    }
                }
            }
        }
        for index in best.into_values() {
            keep[index] = true;
        }
    }

    records
        .into_iter()
        .zip(keep)
        .filter_map(|(record, keep)| keep.then_some(record))
        .collect()
}

/// Byte-wise comparison with ASCII letters folded to lower case.
pub fn cmp_ignore_ascii_case(a: &str, b: &str) -> Ordering {
    a.bytes()
        .map(|c| c.to_ascii_lowercase())
        .cmp(b.bytes().map(|c| c.to_ascii_lowercase()))
}

/// Stable bottom-up merge sort.
///
/// Starts from runs of one element and merges neighbouring runs, doubling
/// the run length each pass, so there is no recursion at any input size.
pub fn merge_sort_by<T, F>(items: Vec<T>, mut compare: F) -> Vec<T>
where
    F: FnMut(&T, &T) -> Ordering,
{
    if items.len() < 2 {
        return items;
    }

    let mut runs: Vec<Vec<T>> = items.into_iter().map(|item| vec![item]).collect();
    while runs.len() > 1 {
        let mut merged = Vec::with_capacity((runs.len() + 1) / 2);
        let mut pairs = runs.into_iter();
        while let Some(left) = pairs.next() {
            match pairs.next() {
                Some(right) => merged.push(merge(left, right, &mut compare)),
                None => merged.push(left),
            }
        }
        runs = merged;
    }
    runs.pop().unwrap_or_default()
}

fn merge<T, F>(left: Vec<T>, right: Vec<T>, compare: &mut F) -> Vec<T>
where
    F: FnMut(&T, &T) -> Ordering,
{
    let mut out = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    loop {
        // Ties take from the left run, which keeps the sort stable.
        let take_left = match (left.peek(), right.peek()) {
            (Some(l), Some(r)) => compare(l, r) != Ordering::Greater,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => break,
        };
        out.extend(if take_left { left.next() } else { right.next() });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(ssid: &str, bssid: &str, strength: i32) -> ScanRecord {
        ScanRecord::new(ssid, bssid, strength)
    }

    fn ssids(records: &[ScanRecord]) -> Vec<&str> {
        records.iter().map(|r| r.ssid.as_str()).collect()
    }

    #[test]
    fn test_scenario_dedup_and_hidden() {
        let input = vec![
            rec("A", "b1", 10),
            rec("A", "b2", 20),
            rec("", "b3", 5),
            rec("B", "b4", 1),
        ];
        assert_eq!(process_scans(input), vec![rec("A", "b2", 20), rec("B", "b4", 1)]);
    }

    #[test]
    fn test_empty_input() {
        assert!(process_scans(Vec::new()).is_empty());
        assert!(process_scans(vec![rec("", "b1", -40)]).is_empty());
    }

    #[test]
    fn test_keeps_maximum_strength() {
        let input = vec![
            rec("Cafe", "c1", -80),
            rec("Home", "h1", -70),
            rec("Cafe", "c2", -40),
            rec("Home", "h2", -75),
            rec("Cafe", "c3", -60),
        ];
        let out = process_scans(input);
        assert_eq!(out, vec![rec("Cafe", "c2", -40), rec("Home", "h1", -70)]);
    }

    #[test]
    fn test_tie_keeps_first_encountered() {
        let input = vec![rec("Net", "first", -50), rec("Net", "second", -50)];
        assert_eq!(process_scans(input)[0].bssid, "first");
    }

    #[test]
    fn test_sorted_ignoring_case() {
        let input = vec![rec("beta", "1", 0), rec("Alpha", "2", 0), rec("GAMMA", "3", 0), rec("alpha2", "4", 0)];
        assert_eq!(ssids(&process_scans(input)), vec!["Alpha", "alpha2", "beta", "GAMMA"]);
    }

    #[test]
    fn test_case_variants_are_distinct_and_stable() {
        let input = vec![rec("home", "1", -30), rec("Home", "2", -90)];
        let out = process_scans(input);
        assert_eq!(ssids(&out), vec!["home", "Home"]);
    }

    #[test]
    fn test_idempotent() {
        let input = vec![
            rec("z", "1", -10),
            rec("y", "2", -20),
            rec("z", "3", -5),
            rec("", "4", 0),
            rec("X", "5", -1),
        ];
        let once = process_scans(input);
        assert_eq!(process_scans(once.clone()), once);
    }

    #[test]
    fn test_sorted_input_unchanged() {
        let input = vec![rec("a", "1", -1), rec("B", "2", -2), rec("c", "3", -3)];
        assert_eq!(process_scans(input.clone()), input);
    }

    #[test]
    fn test_merge_sort_shapes() {
        let cmp = |a: &i32, b: &i32| a.cmp(b);
        assert_eq!(merge_sort_by(Vec::<i32>::new(), cmp), Vec::<i32>::new());
        assert_eq!(merge_sort_by(vec![1], cmp), vec![1]);
        assert_eq!(merge_sort_by((0..100).collect(), cmp), (0..100).collect::<Vec<_>>());
        assert_eq!(merge_sort_by((0..101).rev().collect(), cmp), (0..101).collect::<Vec<_>>());
        assert_eq!(merge_sort_by(vec![3, 1, 2, 5, 4], cmp), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_merge_sort_is_stable() {
        let items: Vec<(u8, usize)> = vec![(2, 0), (1, 1), (2, 2), (1, 3), (0, 4), (2, 5), (1, 6)];
        let sorted = merge_sort_by(items, |a, b| a.0.cmp(&b.0));
        assert_eq!(sorted, vec![(0, 4), (1, 1), (1, 3), (1, 6), (2, 0), (2, 2), (2, 5)]);
    }

    #[test]
    fn test_long_input_sorts() {
        let input: Vec<ScanRecord> = (0..5000)
            .map(|i| rec(&format!("net{:05}", (i * 7919) % 5000), &i.to_string(), -(i as i32 % 90)))
            .collect();
        let out = process_scans(input);
        assert_eq!(out.len(), 5000);
        assert!(out.windows(2).all(|w| cmp_ignore_ascii_case(&w[0].ssid, &w[1].ssid) != Ordering::Greater));
    }
}
