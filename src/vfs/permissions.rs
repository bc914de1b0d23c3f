//! Per-mount capability bits.

use bitflags::bitflags;

bitflags! {
    /// Operations a mount allows. Bits are independent and combinable.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Permissions: u32 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
        const CREATE = 1 << 2;
        const REMOVE = 1 << 3;
        const LIST = 1 << 4;
        const EXECUTE = 1 << 5;

        /// Everything a writable data directory needs.
        const READ_WRITE = Self::READ.bits()
            | Self::WRITE.bits()
            | Self::CREATE.bits()
            | Self::REMOVE.bits()
            | Self::LIST.bits();
    }
}

/// A permission-gated mount operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Exists,
    Read,
    List,
    Write,
    Create,
    Remove,
    Execute,
}

impl Operation {
    /// Bit a mount must carry to allow this operation.
    pub fn required(self) -> Permissions {
        match self {
            Operation::Exists | Operation::Read => Permissions::READ,
            Operation::List => Permissions::LIST,
            Operation::Write => Permissions::WRITE,
            Operation::Create => Permissions::CREATE,
            Operation::Remove => Permissions::REMOVE,
            Operation::Execute => Permissions::EXECUTE,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Operation::Exists => "exists",
            Operation::Read => "read",
            Operation::List => "list",
            Operation::Write => "write",
            Operation::Create => "create",
            Operation::Remove => "remove",
            Operation::Execute => "execute",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bits_are_independent() {
        let all = [
            Permissions::READ,
            Permissions::WRITE,
            Permissions::CREATE,
            Permissions::REMOVE,
            Permissions::LIST,
            Permissions::EXECUTE,
        ];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert!(!a.intersects(*b));
            }
        }
    }

    #[test]
    fn test_read_write_set() {
        let rw = Permissions::READ_WRITE;
        assert!(rw.contains(Permissions::READ | Permissions::WRITE | Permissions::LIST));
        assert!(!rw.contains(Permissions::EXECUTE));
    }

    #[test]
    fn test_exists_needs_read() {
        assert_eq!(Operation::Exists.required(), Permissions::READ);
        assert_eq!(Operation::Execute.required(), Permissions::EXECUTE);
    }
}
