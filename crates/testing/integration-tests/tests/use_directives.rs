//! Scoping of `use` directives and namespaces

use cn_diagnostic::ErrorCode;
use integration_tests::{codes, compile_one};

#[test]
fn use_block_does_not_leak_to_later_siblings() {
    let output = compile_one(|ast| {
        let bar = ast.struct_("Bar", Vec::new());
        let foo = ast.namespace("Foo", vec![bar]);

        let lit = ast.struct_lit("Bar", Vec::new());
        let body = ast.block(vec![lit]);
        let ret = ast.ty("Bar");
        let inside = ast.funct("inside", Vec::new(), Some(ret), body);
        let block = ast.use_block("Foo", vec![inside]);

        let ty = ast.ty("Bar");
        let param = ast.param("b", false, ty);
        let outside = ast.extern_funct("outside", vec![param], None);
        vec![foo, block, outside]
    })
    .unwrap();

    assert_eq!(codes(&output), vec![ErrorCode::Undeclared]);
    let inside = output.funct("inside").unwrap();
    assert_eq!(inside.return_type.display(&output.table).to_string(), "Foo::Bar");
    assert!(output.funct("outside").unwrap().registers[0].ty.is_error());
}

#[test]
fn bare_use_applies_to_following_items_only() {
    let output = compile_one(|ast| {
        let bar = ast.struct_("Bar", Vec::new());
        let foo = ast.namespace("Foo", vec![bar]);
        let ty = ast.ty("Bar");
        let param = ast.param("b", false, ty);
        let before = ast.extern_funct("before", vec![param], None);
        let import = ast.use_all("Foo");
        let ty = ast.ty("Bar");
        let param = ast.param("b", false, ty);
        let after = ast.extern_funct("after", vec![param], None);
        vec![foo, before, import, after]
    })
    .unwrap();

    assert_eq!(codes(&output), vec![ErrorCode::Undeclared]);
    assert!(output.funct("before").unwrap().registers[0].ty.is_error());
    assert!(!output.funct("after").unwrap().registers[0].ty.is_error());
}

#[test]
fn bare_use_inside_namespace_ends_with_it() {
    let output = compile_one(|ast| {
        let bar = ast.struct_("Bar", Vec::new());
        let foo = ast.namespace("Foo", vec![bar]);

        let import = ast.use_all("Foo");
        let ty = ast.ty("Bar");
        let param = ast.param("b", false, ty);
        let inner = ast.extern_funct("inner", vec![param], None);
        let ns = ast.namespace("other", vec![import, inner]);

        let ty = ast.ty("Bar");
        let param = ast.param("b", false, ty);
        let outer = ast.extern_funct("outer", vec![param], None);
        vec![foo, ns, outer]
    })
    .unwrap();

    assert_eq!(codes(&output), vec![ErrorCode::Undeclared]);
    assert!(output.funct("outer").unwrap().registers[0].ty.is_error());
}

#[test]
fn namespace_members_see_each_other() {
    let output = compile_one(|ast| {
        let int = ast.ty("int");
        let point = ast.struct_("Point", vec![("x", int)]);
        let zero = ast.int(0);
        let lit = ast.struct_lit("Point", vec![("x", zero)]);
        let body = ast.block(vec![lit]);
        let ret = ast.ty("Point");
        let origin = ast.funct("origin", Vec::new(), Some(ret), body);
        vec![ast.namespace("geo", vec![point, origin])]
    })
    .unwrap();
    assert!(output.diagnostics.is_empty(), "{:?}", output.diagnostics);
    assert!(output.funct("geo::origin").is_some());
}

#[test]
fn nested_namespace_paths_are_relative() {
    let output = compile_one(|ast| {
        let s = ast.struct_("S", Vec::new());
        let inner = ast.namespace("b", vec![s]);
        let ty = ast.ty("b::S");
        let param = ast.param("s", false, ty);
        let f = ast.extern_funct("f", vec![param], None);
        vec![ast.namespace("a", vec![inner, f])]
    })
    .unwrap();
    assert!(output.diagnostics.is_empty(), "{:?}", output.diagnostics);
    let names: Vec<_> = output.structs().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["a::b::S"]);
}

#[test]
fn absolute_paths_skip_directives() {
    let output = compile_one(|ast| {
        let s = ast.struct_("S", Vec::new());
        let ty = ast.ty("::S");
        let param = ast.param("s", false, ty);
        let f = ast.extern_funct("f", vec![param], None);
        let ty = ast.ty("::a::S");
        let param = ast.param("s", false, ty);
        let g = ast.extern_funct("g", vec![param], None);
        vec![ast.namespace("a", vec![s, f, g])]
    })
    .unwrap();
    assert_eq!(codes(&output), vec![ErrorCode::Undeclared]);
    assert!(output.funct("a::f").unwrap().registers[0].ty.is_error());
    assert!(!output.funct("a::g").unwrap().registers[0].ty.is_error());
}

#[test]
fn same_declaration_through_two_directives_is_not_ambiguous() {
    let output = compile_one(|ast| {
        let bar = ast.struct_("Bar", Vec::new());
        let foo = ast.namespace("Foo", vec![bar]);
        let first = ast.use_all("Foo");
        let second = ast.use_all("Foo");
        let ty = ast.ty("Bar");
        let param = ast.param("b", false, ty);
        let f = ast.extern_funct("f", vec![param], None);
        vec![foo, first, second, f]
    })
    .unwrap();
    assert!(output.diagnostics.is_empty(), "{:?}", output.diagnostics);
}

#[test]
fn block_use_statement_is_scoped_to_the_block() {
    let output = compile_one(|ast| {
        let int = ast.ty("int");
        let value = ast.int(7);
        let seven = ast.funct("seven", Vec::new(), Some(int), value);
        let consts = ast.namespace("consts", vec![seven]);

        let import = ast.use_stmt("consts");
        let callee = ast.name("seven");
        let call = ast.call(callee, Vec::new());
        let call = ast.stmt_expr(call);
        let inner = ast.block_stmts(vec![import, call]);
        let int = ast.ty("int");
        let x = ast.let_("x", false, Some(int), Some(inner));

        let callee = ast.name("seven");
        let call = ast.call(callee, Vec::new());
        let call = ast.stmt_expr(call);
        let body = ast.block_stmts(vec![x, call]);
        vec![consts, ast.funct("main", Vec::new(), None, body)]
    })
    .unwrap();
    assert_eq!(codes(&output), vec![ErrorCode::Undeclared]);
}
