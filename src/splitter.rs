/// One persisted (amount, project) pair produced from a tag selection.
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    pub amount: f64,
    pub project_id: Option<i64>,
}

fn to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

fn from_cents(cents: i64) -> f64 {
    cents as f64 / 100.0
}

/// Drop repeated ids, keeping the first occurrence.
pub fn dedup_tags(tag_ids: &[i64]) -> Vec<i64> {
    let mut seen = Vec::with_capacity(tag_ids.len());
    for id in tag_ids {
        if !seen.contains(id) {
            seen.push(*id);
        }
    }
    seen
}

/// Turn a tag selection into the records to store.
///
/// No tags yields one untagged record, one tag yields one tagged record, and
/// N tags yield N records of `total / N`. The split is done in whole cents;
/// leftover cents go to the first tags in selection order so the parts always
/// add back up to the total.
pub fn resolve(total: f64, tag_ids: &[i64]) -> Vec<Allocation> {
    let tags = dedup_tags(tag_ids);
    match tags.len() {
        0 => vec![Allocation {
            amount: total,
            project_id: None,
        }],
        1 => vec![Allocation {
            amount: total,
            project_id: Some(tags[0]),
        }],
        n => {
            let total_cents = to_cents(total);
            let n = n as i64;
            let base = total_cents / n;
            // Carries the sign of the total, so refunds split the same way.
            let remainder = total_cents % n;
            tags.iter()
                .enumerate()
                .map(|(i, id)| {
                    let extra = if (i as i64) < remainder.abs() {
                        remainder.signum()
                    } else {
                        0
                    };
                    Allocation {
                        amount: from_cents(base + extra),
                        project_id: Some(*id),
                    }
                })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sum(allocs: &[Allocation]) -> f64 {
        allocs.iter().map(|a| a.amount).sum()
    }

    #[test]
    fn test_no_tags() {
        assert_eq!(
            resolve(100.0, &[]),
            vec![Allocation { amount: 100.0, project_id: None }]
        );
    }

    #[test]
    fn test_single_tag() {
        assert_eq!(
            resolve(100.0, &[7]),
            vec![Allocation { amount: 100.0, project_id: Some(7) }]
        );
    }

    #[test]
    fn test_single_tag_keeps_exact_amount() {
        let allocs = resolve(12.345, &[7]);
        assert_eq!(allocs[0].amount, 12.345);
    }

    #[test]
    fn test_three_way_split() {
        let allocs = resolve(100.0, &[7, 8, 9]);
        assert_eq!(allocs.len(), 3);
        for a in &allocs {
            assert!((a.amount - 33.33).abs() < 0.011, "got {}", a.amount);
        }
        assert!((sum(&allocs) - 100.0).abs() < 1e-9);
        let ids: Vec<i64> = allocs.iter().filter_map(|a| a.project_id).collect();
        assert_eq!(ids, vec![7, 8, 9]);
    }

    #[test]
    fn test_remainder_goes_to_first_tags() {
        let allocs = resolve(0.05, &[1, 2, 3]);
        let amounts: Vec<f64> = allocs.iter().map(|a| a.amount).collect();
        assert_eq!(amounts, vec![0.02, 0.02, 0.01]);
    }

    #[test]
    fn test_negative_split() {
        let allocs = resolve(-100.0, &[1, 2, 3]);
        assert_eq!(allocs[0].amount, -33.34);
        assert_eq!(allocs[1].amount, -33.33);
        assert_eq!(allocs[2].amount, -33.33);
        assert!((sum(&allocs) + 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_duplicate_tags_collapse() {
        let allocs = resolve(90.0, &[4, 5, 4]);
        assert_eq!(allocs.len(), 2);
        assert_eq!(allocs[0].amount, 45.0);
        assert_eq!(allocs[1].project_id, Some(5));
    }

    #[test]
    fn test_every_tag_appears_once() {
        for n in 2..12i64 {
            let ids: Vec<i64> = (100..100 + n).collect();
            let allocs = resolve(1234.57, &ids);
            assert_eq!(allocs.len() as i64, n);
            let mut got: Vec<i64> = allocs.iter().filter_map(|a| a.project_id).collect();
            got.sort();
            assert_eq!(got, ids);
            assert!((sum(&allocs) - 1234.57).abs() < 0.005);
        }
    }
}
