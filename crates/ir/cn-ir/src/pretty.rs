//! Textual rendering of IR

use crate::{FunctId, Instruction, IrFunct, IrStruct, Literal, Terminator};
use cn_intern::Interner;
use cn_ty::StructNames;
use std::fmt;

/// Names of declarations, for rendering
pub trait IrNames: StructNames {
    /// Display name of a function
    fn funct_name(&self, id: FunctId) -> String;
}

/// Renders a struct as `struct Name { field: type, .. }`
pub struct StructDisplay<'a> {
    /// Struct name
    pub name: &'a str,
    /// Struct declaration
    pub decl: &'a IrStruct,
    /// Interner holding field names
    pub interner: &'a Interner,
    /// Declaration names
    pub names: &'a dyn IrNames,
}

impl fmt::Display for StructDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "struct {} {{", self.name)?;
        for (idx, field) in self.decl.fields.iter().enumerate() {
            let sep = if idx == 0 { " " } else { ", " };
            write!(
                f,
                "{sep}{}: {}",
                self.interner.resolve(&field.name),
                field.ty.display(self.names)
            )?;
        }
        if !self.decl.fields.is_empty() {
            f.write_str(" ")?;
        }
        f.write_str("}")
    }
}

/// Renders a function: header, register table, bindings, then segments
pub struct FunctDisplay<'a> {
    /// Function name
    pub name: &'a str,
    /// Function
    pub funct: &'a IrFunct,
    /// Interner holding local names
    pub interner: &'a Interner,
    /// Declaration names
    pub names: &'a dyn IrNames,
}

impl fmt::Display for FunctDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let funct = self.funct;
        let names = self.names;

        if funct.external {
            f.write_str("extern ")?;
        }
        write!(f, "fn {}(", self.name)?;
        for (idx, param) in funct.params().iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "r{idx}: {}", param.ty.display(names))?;
        }
        writeln!(f, ") -> {}", funct.return_type.display(names))?;

        for (idx, register) in funct.registers.iter().enumerate().skip(funct.param_count) {
            writeln!(f, "  r{idx}: {}", register.ty.display(names))?;
        }
        for binding in &funct.bindings {
            let qualifier = if binding.mutable { "mut " } else { "" };
            writeln!(
                f,
                "  let {qualifier}{} = {}",
                self.interner.resolve(&binding.name),
                binding.register
            )?;
        }

        for (idx, segment) in funct.segments.iter().enumerate() {
            writeln!(f, "s{idx}:")?;
            for instruction in &segment.instructions {
                f.write_str("    ")?;
                self.instruction(f, instruction)?;
                f.write_str("\n")?;
            }
            f.write_str("    ")?;
            terminator(f, &segment.terminator)?;
            f.write_str("\n")?;
        }
        Ok(())
    }
}

impl FunctDisplay<'_> {
    fn instruction(&self, f: &mut fmt::Formatter<'_>, instruction: &Instruction) -> fmt::Result {
        match instruction {
            Instruction::MoveLiteral { literal, dest } => {
                write!(f, "{dest} = ")?;
                self.literal(f, literal)
            }
            Instruction::Move { source, dest } => write!(f, "{dest} = {source}"),
            Instruction::MoveAddress {
                source,
                mutable,
                dest,
            } => {
                let qualifier = if *mutable { "mut " } else { "" };
                write!(f, "{dest} = &{qualifier}{source}")
            }
            Instruction::MoveCall { callee, args, dest } => {
                write!(f, "{dest} = call {callee}(")?;
                list(f, args)?;
                f.write_str(")")
            }
        }
    }

    fn literal(&self, f: &mut fmt::Formatter<'_>, literal: &Literal) -> fmt::Result {
        match literal {
            Literal::Int(value) => write!(f, "{value}"),
            Literal::Bool(value) => write!(f, "{value}"),
            Literal::Tuple(elements) => {
                f.write_str("(")?;
                list(f, elements)?;
                if elements.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
            Literal::Struct { id, fields } => {
                write!(f, "{} {{ ", self.names.struct_name(*id))?;
                list(f, fields)?;
                f.write_str(" }")
            }
            Literal::Funct(id) => write!(f, "fn {}", self.names.funct_name(*id)),
        }
    }
}

fn list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (idx, item) in items.iter().enumerate() {
        if idx > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

fn terminator(f: &mut fmt::Formatter<'_>, terminator: &Terminator) -> fmt::Result {
    match terminator {
        Terminator::End => f.write_str("end"),
        Terminator::Return(value) => write!(f, "return {value}"),
        Terminator::Goto(target) => write!(f, "goto {target}"),
        Terminator::Branch {
            condition,
            on_true,
            on_false,
        } => write!(f, "branch {condition} ? {on_true} : {on_false}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DataAccess, Field, FunctBuilder, RegisterId};
    use cn_span::{FileId, FileSpan, Span};
    use cn_ty::{StructId, Type};
    use expect_test::expect;

    struct Names;

    impl StructNames for Names {
        fn struct_name(&self, id: StructId) -> String {
            ["int", "bool", "Point"][id.index()].to_string()
        }
    }

    impl IrNames for Names {
        fn funct_name(&self, id: FunctId) -> String {
            format!("f{}", id.0)
        }
    }

    fn span() -> FileSpan {
        FileSpan::new(FileId::new(0), Span::new(0, 1))
    }

    #[test]
    fn prints_function() {
        let interner = Interner::new();
        let int = Type::Struct(StructId(0));
        let mut builder = FunctBuilder::new(0);
        let param = builder
            .add_param(interner.intern("p"), Type::pointer(true, int.clone()), false, span())
            .unwrap();
        let result = builder.add_register(int.clone(), span());
        let cond = builder.add_register(Type::Struct(StructId(1)), span());
        builder.bind(interner.intern("flag"), cond, true);
        let on_true = builder.new_segment();
        let on_false = builder.new_segment();

        builder.push(Instruction::MoveLiteral {
            literal: Literal::Bool(true),
            dest: DataAccess::register(cond),
        });
        builder
            .terminate(Terminator::Branch {
                condition: DataAccess::register(cond),
                on_true,
                on_false,
            })
            .unwrap();
        builder.switch_to(on_true);
        builder.push_move(
            DataAccess::Register {
                register: param,
                fields: Vec::new(),
                deref: true,
            },
            DataAccess::register(result),
        );
        builder
            .terminate(Terminator::Return(DataAccess::register(result)))
            .unwrap();
        builder.switch_to(on_false);
        builder.push(Instruction::MoveCall {
            callee: DataAccess::register(RegisterId(1)),
            args: vec![DataAccess::register(param)],
            dest: DataAccess::Discard,
        });
        builder.push(Instruction::MoveLiteral {
            literal: Literal::Funct(FunctId(3)),
            dest: DataAccess::Discard,
        });
        builder.terminate(Terminator::End).unwrap();
        let funct = builder.finish(int, span()).unwrap();

        let text = FunctDisplay {
            name: "pick",
            funct: &funct,
            interner: &interner,
            names: &Names,
        }
        .to_string();
        expect![[r#"
            fn pick(r0: *mut int) -> int
              r1: int
              r2: bool
              let p = r0
              let mut flag = r2
            s0:
                r2 = true
                branch r2 ? s1 : s2
            s1:
                r1 = *r0
                return r1
            s2:
                _ = call r1(r0)
                _ = fn f3
                end
        "#]]
        .assert_eq(&text);
    }

    #[test]
    fn prints_struct() {
        let interner = Interner::new();
        let mut decl = IrStruct::new(span());
        for name in ["x", "y"] {
            decl.fields.push(Field {
                name: interner.intern(name),
                ty: Type::Struct(StructId(0)),
                span: span(),
            });
        }
        let text = StructDisplay {
            name: "Point",
            decl: &decl,
            interner: &interner,
            names: &Names,
        }
        .to_string();
        assert_eq!(text, "struct Point { x: int, y: int }");

        let empty = IrStruct::new(span());
        let text = StructDisplay {
            name: "Unit",
            decl: &empty,
            interner: &interner,
            names: &Names,
        }
        .to_string();
        assert_eq!(text, "struct Unit {}");
    }

    #[test]
    fn prints_aggregate_literals() {
        let interner = Interner::new();
        let mut builder = FunctBuilder::new(0);
        let reg = builder.add_register(Type::Struct(StructId(0)), span());
        builder.push(Instruction::MoveLiteral {
            literal: Literal::Tuple(vec![DataAccess::register(reg)]),
            dest: DataAccess::Discard,
        });
        builder.push(Instruction::MoveLiteral {
            literal: Literal::Struct {
                id: StructId(2),
                fields: vec![DataAccess::register(reg), DataAccess::register(reg)],
            },
            dest: DataAccess::Discard,
        });
        builder.push(Instruction::MoveAddress {
            source: DataAccess::register(reg).field(1),
            mutable: true,
            dest: DataAccess::Discard,
        });
        builder.terminate(Terminator::End).unwrap();
        let funct = builder.finish(Type::unit(), span()).unwrap();
        let text = FunctDisplay {
            name: "lits",
            funct: &funct,
            interner: &interner,
            names: &Names,
        }
        .to_string();
        assert!(text.contains("_ = (r0,)"));
        assert!(text.contains("_ = Point { r0, r0 }"));
        assert!(text.contains("_ = &mut r0.1"));
    }
}
