//! External transaction identifiers and XA protocol constants
//!
//! The transaction manager hands the branch participant an opaque [`Xid`]
//! for every global transaction branch. The connector only compares and
//! hashes them; it never interprets their contents.

use std::fmt;

/// External transaction identifier (X/Open XA `XID`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Xid {
    format_id: i32,
    global_transaction_id: Vec<u8>,
    branch_qualifier: Vec<u8>,
}

impl Xid {
    /// Create a transaction identifier
    ///
    /// Both byte strings are kept as given, whatever their length.
    pub fn new(format_id: i32, global_transaction_id: &[u8], branch_qualifier: &[u8]) -> Self {
        Self {
            format_id,
            global_transaction_id: global_transaction_id.to_vec(),
            branch_qualifier: branch_qualifier.to_vec(),
        }
    }

    /// Format identifier
    pub fn format_id(&self) -> i32 {
        self.format_id
    }

    /// Global transaction identifier
    pub fn global_transaction_id(&self) -> &[u8] {
        &self.global_transaction_id
    }

    /// Branch qualifier
    pub fn branch_qualifier(&self) -> &[u8] {
        &self.branch_qualifier
    }
}

impl fmt::Display for Xid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.format_id)?;
        for b in &self.global_transaction_id {
            write!(f, "{:02x}", b)?;
        }
        f.write_str(":")?;
        for b in &self.branch_qualifier {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

/// Flags passed by the transaction manager to branch operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct XaFlags(i32);

impl XaFlags {
    /// No flags set
    pub const TMNOFLAGS: XaFlags = XaFlags(0x0000_0000);
    /// Joining an existing branch
    pub const TMJOIN: XaFlags = XaFlags(0x0020_0000);
    /// Resuming a suspended association
    pub const TMRESUME: XaFlags = XaFlags(0x0800_0000);
    /// Dissociate: work completed successfully
    pub const TMSUCCESS: XaFlags = XaFlags(0x0400_0000);
    /// Dissociate: work failed, branch is rollback-only
    pub const TMFAIL: XaFlags = XaFlags(0x2000_0000);
    /// Suspend (not end) the association
    pub const TMSUSPEND: XaFlags = XaFlags(0x0200_0000);
    /// Start a recovery scan
    pub const TMSTARTRSCAN: XaFlags = XaFlags(0x0100_0000);
    /// End a recovery scan
    pub const TMENDRSCAN: XaFlags = XaFlags(0x0080_0000);
    /// One-phase commit optimisation
    pub const TMONEPHASE: XaFlags = XaFlags(0x4000_0000);

    /// Wrap raw flag bits
    pub const fn from_bits(bits: i32) -> Self {
        XaFlags(bits)
    }

    /// Raw flag bits
    pub const fn bits(&self) -> i32 {
        self.0
    }

    /// True when every bit of `other` is set
    pub fn contains(&self, other: XaFlags) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for XaFlags {
    type Output = XaFlags;

    fn bitor(self, rhs: XaFlags) -> XaFlags {
        XaFlags(self.0 | rhs.0)
    }
}

impl fmt::Display for XaFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// Outcome of the prepare phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Vote {
    /// XA_OK: prepared, commit may follow
    Ok,
    /// XA_RDONLY: branch was read-only and is already complete
    ReadOnly,
}

impl Vote {
    /// Numeric code as defined by X/Open XA
    pub fn code(&self) -> i32 {
        match self {
            Vote::Ok => 0,
            Vote::ReadOnly => 3,
        }
    }
}
