//! Access rights bitset

use bitflags::bitflags;

bitflags! {
    /// The rights a rule can grant, or a query can require.
    ///
    /// Path rules only ever carry `READ` and `WRITE`. `RECURSIVE` is a
    /// query modifier: when present in a requirement it asks whether the
    /// rights hold on *every* path below the queried one, and it is
    /// stripped before any rule evaluation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Rights: u8 {
        /// Permission to read a path.
        const READ = 0x01;
        /// Permission to change a path.
        const WRITE = 0x02;
        /// Query modifier: require the rights on the whole subtree.
        const RECURSIVE = 0x04;
    }
}

impl Rights {
    /// The rights a path rule may grant.
    pub const fn rule_mask() -> Rights {
        Rights::READ.union(Rights::WRITE)
    }
}
