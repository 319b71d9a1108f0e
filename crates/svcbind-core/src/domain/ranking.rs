//! Ranking of simultaneously matching providers.
//!
//! Which provider becomes the "set" target is not decided by the dependency
//! itself; it is an injected comparator so the registry's notion of priority
//! can be plugged in.

use super::service::ServiceReference;
use std::cmp::Ordering;

/// Orders candidate providers; `Ordering::Greater` means `a` is preferred.
pub trait ProviderRanking: Send + Sync {
    fn compare(&self, a: &ServiceReference, b: &ServiceReference) -> Ordering;
}

/// Higher `service.ranking` wins; on a tie the older registration (lower id) wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServiceRankingOrder;

impl ProviderRanking for ServiceRankingOrder {
    fn compare(&self, a: &ServiceReference, b: &ServiceReference) -> Ordering {
        a.ranking
            .cmp(&b.ranking)
            .then_with(|| b.service_id.cmp(&a.service_id))
    }
}

impl<F> ProviderRanking for F
where
    F: Fn(&ServiceReference, &ServiceReference) -> Ordering + Send + Sync,
{
    fn compare(&self, a: &ServiceReference, b: &ServiceReference) -> Ordering {
        self(a, b)
    }
}

/// Pick the preferred reference among `candidates`.
pub fn best_of<'a, I>(ranking: &dyn ProviderRanking, candidates: I) -> Option<&'a ServiceReference>
where
    I: IntoIterator<Item = &'a ServiceReference>,
{
    candidates
        .into_iter()
        .fold(None, |best: Option<&ServiceReference>, candidate| match best {
            Some(current) if ranking.compare(current, candidate) != Ordering::Less => Some(current),
            _ => Some(candidate),
        })
}
