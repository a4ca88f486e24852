//! Structural checks on finished IR

use crate::{DataAccess, IrFunct, SegmentId};
use cn_diagnostic::InternalError;
use cn_ty::Type;

/// Check the invariants code generation relies on
///
/// Segments, registers and bindings must reference existing entries, no
/// register type may still hold a placeholder, and the parameter count must
/// fit in the register list. `function` only labels the error.
pub fn verify(function: usize, funct: &IrFunct) -> Result<(), InternalError> {
    if funct.param_count > funct.registers.len() {
        return Err(InternalError::ParameterCount {
            function,
            param_count: funct.param_count,
            registers: funct.registers.len(),
        });
    }

    for (idx, register) in funct.registers.iter().enumerate() {
        if register.ty.any(&mut |ty| matches!(ty, Type::Placeholder(_))) {
            return Err(InternalError::UnresolvedPlaceholder {
                function,
                register: idx as u32,
            });
        }
    }

    let check_register = |access: &DataAccess| match access.base() {
        Some(register) if funct.register(register).is_none() => {
            Err(InternalError::DanglingRegister {
                function,
                register: register.0,
            })
        }
        _ => Ok(()),
    };

    for binding in &funct.bindings {
        check_register(&DataAccess::register(binding.register))?;
    }

    for segment in &funct.segments {
        for instruction in &segment.instructions {
            for access in instruction.accesses() {
                check_register(access)?;
            }
        }
        for access in segment.terminator.accesses() {
            check_register(access)?;
        }
        for target in segment.terminator.successors() {
            if funct.segment(target).is_none() {
                return Err(InternalError::DanglingSegment {
                    function,
                    target: target.0,
                });
            }
        }
    }

    Ok(())
}

/// Reachability of every segment from the entry
#[must_use]
pub fn reachable_segments(funct: &IrFunct) -> Vec<bool> {
    let mut reachable = vec![false; funct.segments.len()];
    if funct.segments.is_empty() {
        return reachable;
    }
    let mut work = vec![SegmentId::ENTRY];
    while let Some(id) = work.pop() {
        let Some(seen) = reachable.get_mut(id.index()) else {
            continue;
        };
        if *seen {
            continue;
        }
        *seen = true;
        if let Some(segment) = funct.segment(id) {
            work.extend(segment.terminator.successors());
        }
    }
    reachable
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Instruction, Literal, Register, RegisterId, Segment, Terminator};
    use cn_span::{FileId, FileSpan, Span};
    use cn_ty::{Slot, StructId};

    fn span() -> FileSpan {
        FileSpan::new(FileId::new(0), Span::new(0, 1))
    }

    fn funct(segments: Vec<Segment>, registers: Vec<Type>) -> IrFunct {
        let mut funct = IrFunct::new(span());
        funct.segments = segments;
        funct.registers = registers
            .into_iter()
            .map(|ty| Register { ty, span: span() })
            .collect();
        funct
    }

    fn segment(terminator: Terminator) -> Segment {
        Segment {
            instructions: Vec::new(),
            terminator,
        }
    }

    #[test]
    fn accepts_well_formed_function() {
        let body = funct(
            vec![
                segment(Terminator::Branch {
                    condition: DataAccess::register(RegisterId(0)),
                    on_true: SegmentId(1),
                    on_false: SegmentId(1),
                }),
                segment(Terminator::End),
            ],
            vec![Type::Struct(StructId(1))],
        );
        assert_eq!(verify(0, &body), Ok(()));
        assert_eq!(reachable_segments(&body), vec![true, true]);
    }

    #[test]
    fn rejects_dangling_segment() {
        let body = funct(vec![segment(Terminator::Goto(SegmentId(3)))], Vec::new());
        assert_eq!(
            verify(2, &body),
            Err(InternalError::DanglingSegment {
                function: 2,
                target: 3
            })
        );
    }

    #[test]
    fn rejects_dangling_register() {
        let mut body = funct(vec![segment(Terminator::End)], Vec::new());
        body.segments[0].instructions.push(Instruction::MoveLiteral {
            literal: Literal::Int(3),
            dest: DataAccess::register(RegisterId(7)),
        });
        assert!(matches!(
            verify(0, &body),
            Err(InternalError::DanglingRegister { register: 7, .. })
        ));
    }

    #[test]
    fn rejects_placeholder_register() {
        let body = funct(
            vec![segment(Terminator::End)],
            vec![Type::Tuple(vec![Type::Placeholder(Slot(0))])],
        );
        assert!(matches!(
            verify(0, &body),
            Err(InternalError::UnresolvedPlaceholder { register: 0, .. })
        ));
    }

    #[test]
    fn dead_segment_is_unreachable() {
        let body = funct(
            vec![segment(Terminator::End), segment(Terminator::End)],
            Vec::new(),
        );
        assert_eq!(reachable_segments(&body), vec![true, false]);
    }
}
