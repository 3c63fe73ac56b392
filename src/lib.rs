#![deny(missing_docs)]

//! Crate with ordered collections built on one height-balanced search tree engine
//! that supports logarithmic split and join, in particular [`collections::AvlMap`],
//! [`collections::AvlSet`], [`collections::SumSet`], [`collections::SeqList`] and
//! [`collections::Rope`].

//! The same rebalancing and joining engine serves two node disciplines: an
//! explicit-key ordered map, and an implicit-key (positional) sequence where an
//! element's place is given by its rank alone. A third variant augments every
//! subtree with a cached key sum for logarithmic range-sum queries. A
//! [`collections::SplayMap`] with the same split/join contract is included as a
//! simpler, self-adjusting alternative balancing policy.

/// Containers.
pub mod collections;
