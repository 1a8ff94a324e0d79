//! Mode letters to Landlock access rights.

use landlock::{Access, AccessFs, BitFlags};

use crate::abi::CapabilityLevel;
use crate::rule::PathRule;

/// Rights granted by `c` on a directory, before the `Refer` bit.
fn create_rights() -> BitFlags<AccessFs> {
    AccessFs::MakeReg
        | AccessFs::MakeSock
        | AccessFs::MakeFifo
        | AccessFs::MakeBlock
        | AccessFs::MakeSym
        | AccessFs::MakeDir
        | AccessFs::RemoveFile
        | AccessFs::RemoveDir
}

/// Every right the ruleset handles at `level`. Anything handled but not
/// granted by a rule is denied.
pub fn handled_access(level: CapabilityLevel) -> BitFlags<AccessFs> {
    AccessFs::from_all(level.abi())
}

/// The rights `rule`'s mode string grants at `level`.
///
/// `c` only means something for directories; on a file it adds nothing.
pub fn rule_access(rule: &PathRule, level: CapabilityLevel) -> BitFlags<AccessFs> {
    let mut allow = BitFlags::<AccessFs>::empty();
    for letter in rule.mode().chars() {
        match letter {
            'r' => {
                allow |= AccessFs::ReadFile;
                if rule.is_dir() {
                    allow |= AccessFs::ReadDir;
                }
            }
            'w' => {
                allow |= AccessFs::WriteFile;
                if level.has_truncate() {
                    allow |= AccessFs::Truncate;
                }
            }
            'x' => allow |= AccessFs::Execute,
            'c' if rule.is_dir() => {
                allow |= create_rights();
                if level.has_refer() {
                    allow |= AccessFs::Refer;
                }
            }
            _ => {}
        }
    }
    allow
}
