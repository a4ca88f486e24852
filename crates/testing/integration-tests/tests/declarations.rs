//! Declaration registration and name lookup

use cn_diagnostic::ErrorCode;
use integration_tests::{codes, compile_one, messages, TestFixture};

#[test]
fn duplicate_struct_keeps_first() {
    let output = compile_one(|ast| {
        let int = ast.ty("int");
        let first = ast.struct_("Point", vec![("x", int)]);
        let int = ast.ty("int");
        let int2 = ast.ty("int");
        let second = ast.struct_("Point", vec![("x", int), ("y", int2)]);
        vec![first, second]
    })
    .unwrap();

    assert_eq!(codes(&output), vec![ErrorCode::DuplicateDeclaration]);
    let structs: Vec<_> = output.structs().collect();
    assert_eq!(structs.len(), 1);
    assert_eq!(structs[0].0, "Point");
    assert_eq!(structs[0].1.fields.len(), 1);

    let inner = output.diagnostics[0].inner.as_ref().unwrap();
    assert_eq!(inner.message, "first declared here");
}

#[test]
fn duplicate_across_files() {
    let mut fixture = TestFixture::new();
    fixture.add_file(|ast| {
        let body = ast.block(Vec::new());
        vec![ast.funct("main", Vec::new(), None, body)]
    });
    fixture.add_file(|ast| {
        let body = ast.block(Vec::new());
        vec![ast.funct("main", Vec::new(), None, body)]
    });
    let output = fixture.compile().unwrap();
    assert_eq!(codes(&output), vec![ErrorCode::DuplicateDeclaration]);
    assert_eq!(output.functs().count(), 1);
}

#[test]
fn builtin_type_cannot_be_redeclared() {
    let output = compile_one(|ast| vec![ast.struct_("int", Vec::new())]).unwrap();

    assert_eq!(codes(&output), vec![ErrorCode::DuplicateDeclaration]);
    assert_eq!(
        messages(&output),
        vec!["`int` is a builtin type and cannot be redeclared"]
    );
    assert!(output.diagnostics[0].inner.is_none());
    assert_eq!(output.structs().count(), 0);
}

#[test]
fn same_name_in_different_namespaces_is_fine() {
    let output = compile_one(|ast| {
        let a = ast.struct_("Item", Vec::new());
        let b = ast.struct_("Item", Vec::new());
        let first = ast.namespace("a", vec![a]);
        let second = ast.namespace("b", vec![b]);
        vec![first, second]
    })
    .unwrap();
    assert!(output.diagnostics.is_empty());
    let names: Vec<_> = output.structs().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["a::Item", "b::Item"]);
}

#[test]
fn ambiguity_between_two_names_both() {
    let output = compile_one(|ast| {
        let x = ast.struct_("T", Vec::new());
        let y = ast.struct_("T", Vec::new());
        let x = ast.namespace("x", vec![x]);
        let y = ast.namespace("y", vec![y]);
        let use_x = ast.use_all("x");
        let use_y = ast.use_all("y");
        let ty = ast.ty("T");
        let param = ast.param("t", false, ty);
        let f = ast.extern_funct("f", vec![param], None);
        vec![x, y, use_x, use_y, f]
    })
    .unwrap();

    assert_eq!(codes(&output), vec![ErrorCode::AmbiguousDeclaration]);
    let message = messages(&output)[0];
    assert!(message.contains("`x::T`"), "{message}");
    assert!(message.contains("`y::T`"), "{message}");
    assert!(!message.contains("other"), "{message}");
}

#[test]
fn ambiguity_between_many_names_is_summarized() {
    let output = compile_one(|ast| {
        let mut items = Vec::new();
        for ns in ["a", "b", "c", "d"] {
            let decl = ast.struct_("T", Vec::new());
            items.push(ast.namespace(ns, vec![decl]));
        }
        for ns in ["a", "b", "c", "d"] {
            items.push(ast.use_all(ns));
        }
        let ty = ast.ty("T");
        let param = ast.param("t", false, ty);
        items.push(ast.extern_funct("f", vec![param], None));
        items
    })
    .unwrap();

    assert_eq!(codes(&output), vec![ErrorCode::AmbiguousDeclaration]);
    assert!(messages(&output)[0].ends_with("...and 2 other"));
}

#[test]
fn function_is_not_a_type() {
    let output = compile_one(|ast| {
        let helper = ast.extern_funct("helper", Vec::new(), None);
        let ty = ast.ty("helper");
        let param = ast.param("h", false, ty);
        let f = ast.extern_funct("f", vec![param], None);
        vec![helper, f]
    })
    .unwrap();
    assert_eq!(codes(&output), vec![ErrorCode::WrongDeclarationKind]);
    assert_eq!(messages(&output), vec!["expected type, found function `helper`"]);
}

#[test]
fn struct_is_not_a_value() {
    let output = compile_one(|ast| {
        let unit = ast.struct_("Unit", Vec::new());
        let value = ast.name("Unit");
        let body = ast.block(vec![value]);
        vec![unit, ast.funct("main", Vec::new(), None, body)]
    })
    .unwrap();
    assert_eq!(codes(&output), vec![ErrorCode::WrongDeclarationKind]);
}

#[test]
fn undeclared_type_suggests_close_names() {
    let output = compile_one(|ast| {
        let point = ast.struct_("Point", Vec::new());
        let ty = ast.ty("Pont");
        let param = ast.param("p", false, ty);
        let f = ast.extern_funct("f", vec![param], None);
        vec![point, f]
    })
    .unwrap();
    assert_eq!(codes(&output), vec![ErrorCode::Undeclared]);
    let inner = output.diagnostics[0].inner.as_ref().unwrap();
    assert_eq!(inner.message, "did you mean `Point`?");
}

#[test]
fn failed_parameter_type_keeps_other_parameters() {
    let output = compile_one(|ast| {
        let missing = ast.ty("Missing");
        let int = ast.ty("int");
        let bad = ast.param("a", false, missing);
        let good = ast.param("b", false, int);
        vec![ast.extern_funct("f", vec![bad, good], None)]
    })
    .unwrap();
    assert_eq!(codes(&output), vec![ErrorCode::Undeclared]);
    let f = output.funct("f").unwrap();
    assert_eq!(f.param_count, 2);
    assert!(f.registers[0].ty.is_error());
    assert_eq!(f.registers[1].ty.display(&output.table).to_string(), "int");
}
