// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Partitioning of a node's cores among thread roles.

use crate::error::AllocError;
use control::ids::LCoreId;
use core::fmt::Debug;
use core::hash::Hash;
use ordermap::OrderMap;
use tracing::trace;

/// Hands out cores from an ordered list, front to back, never reusing one.
#[derive(Debug)]
pub struct ResourceAllocator<'a> {
    cores: &'a [LCoreId],
    next: usize,
}

impl<'a> ResourceAllocator<'a> {
    #[must_use]
    pub fn new(cores: &'a [LCoreId]) -> Self {
        Self { cores, next: 0 }
    }

    /// Cores not yet handed out.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.cores.len() - self.next
    }

    /// Take the next `count` cores.
    pub fn take(&mut self, count: usize) -> Result<Vec<LCoreId>, AllocError> {
        if count > self.remaining() {
            return Err(AllocError::Insufficient {
                requested: self.next + count,
                available: self.cores.len(),
            });
        }
        let taken = self.cores[self.next..self.next + count].to_vec();
        self.next += count;
        Ok(taken)
    }

    /// Satisfy `requests` in order, one disjoint group per role.
    ///
    /// Either every request is satisfied or none is: on failure the allocator is unchanged.
    pub fn allocate<R>(
        &mut self,
        requests: &[(R, usize)],
    ) -> Result<OrderMap<R, Vec<LCoreId>>, AllocError>
    where
        R: Copy + Eq + Hash + Debug,
    {
        let requested: usize = requests.iter().map(|(_, n)| n).sum();
        if requested > self.remaining() {
            return Err(AllocError::Insufficient {
                requested: self.next + requested,
                available: self.cores.len(),
            });
        }
        let mut groups = OrderMap::with_capacity(requests.len());
        for (role, _) in requests {
            if groups.contains_key(role) {
                return Err(AllocError::DuplicateRole(format!("{role:?}")));
            }
            groups.insert(*role, Vec::new());
        }
        for (role, count) in requests {
            let cores = self.take(*count)?;
            trace!("allocated {role:?}: {cores:?}");
            if let Some(group) = groups.get_mut(role) {
                *group = cores;
            }
        }
        Ok(groups)
    }
}

/// Allocate `requests` from a fresh allocator over `cores`.
pub fn allocate<R>(
    cores: &[LCoreId],
    requests: &[(R, usize)],
) -> Result<OrderMap<R, Vec<LCoreId>>, AllocError>
where
    R: Copy + Eq + Hash + Debug,
{
    ResourceAllocator::new(cores).allocate(requests)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test {
    use super::*;
    use control::activate::LCoreRole;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeSet;

    fn cores(ids: impl IntoIterator<Item = u32>) -> Vec<LCoreId> {
        ids.into_iter().map(LCoreId).collect()
    }

    #[test]
    fn consumes_in_order_without_gaps() {
        let list = cores([10, 11, 12, 13, 14, 15]);
        let groups = allocate(
            &list,
            &[
                (LCoreRole::Rx, 2),
                (LCoreRole::Tx, 2),
                (LCoreRole::Fwd, 1),
            ],
        )
        .unwrap();
        assert_eq!(groups[&LCoreRole::Rx], cores([10, 11]));
        assert_eq!(groups[&LCoreRole::Tx], cores([12, 13]));
        assert_eq!(groups[&LCoreRole::Fwd], cores([14]));
        assert_eq!(
            groups.keys().copied().collect::<Vec<_>>(),
            vec![LCoreRole::Rx, LCoreRole::Tx, LCoreRole::Fwd]
        );
    }

    #[test]
    fn over_request_fails_without_consuming() {
        let list = cores(0..4);
        let mut allocator = ResourceAllocator::new(&list);
        assert_eq!(
            allocator.allocate(&[(LCoreRole::Rx, 2), (LCoreRole::Tx, 3)]),
            Err(AllocError::Insufficient {
                requested: 5,
                available: 4
            })
        );
        assert_eq!(allocator.remaining(), 4);
        assert!(matches!(
            allocator.allocate(&[(LCoreRole::Rx, 1), (LCoreRole::Rx, 1)]),
            Err(AllocError::DuplicateRole(_))
        ));
    }

    #[test]
    fn partition_properties() {
        bolero::check!()
            .with_type()
            .cloned()
            .for_each(|(available, counts): (u8, [u8; 4])| {
                let list = cores(0..u32::from(available));
                let roles = [LCoreRole::Rx, LCoreRole::Tx, LCoreRole::Fwd, LCoreRole::Crypto];
                let requests: Vec<_> = roles
                    .iter()
                    .zip(counts)
                    .map(|(r, n)| (*r, usize::from(n % 8)))
                    .collect();
                let total: usize = requests.iter().map(|(_, n)| n).sum();
                match allocate(&list, &requests) {
                    Ok(groups) => {
                        assert!(total <= list.len());
                        let mut seen = BTreeSet::new();
                        for (role, n) in &requests {
                            let group = &groups[role];
                            assert_eq!(group.len(), *n);
                            assert_eq!(group.is_empty(), *n == 0);
                            for core in group {
                                assert!(seen.insert(*core), "core {core} handed out twice");
                            }
                        }
                        assert_eq!(seen.len(), total);
                    }
                    Err(AllocError::Insufficient { requested, available }) => {
                        assert!(total > list.len());
                        assert_eq!(requested, total);
                        assert_eq!(available, list.len());
                    }
                    Err(e) => panic!("unexpected {e}"),
                }
            });
    }
}
