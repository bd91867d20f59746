// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

mod common;

use boogie_ast::{BinOp, BoogieType, Expression, Ident, Statement, UnOp};
use bytecode_boogie_backend::{
    translate_body, ErrorModel, TranslationContext, TranslationOptions,
};
use class_bytecode::{BinaryOp, BodyBuilder, Constant, NodeId, Stmt, Value};
use class_model::{Annotation, MethodDecl, MethodId, ProgramBuilder, Type};
use common::{render, translate, translate_with};
use std::collections::BTreeSet;

fn label(method: MethodId, node: NodeId) -> String {
    format!("block_{}_{}", method.as_usize(), node)
}

#[test]
fn test_static_void_return_is_minimal() {
    let mut builder = ProgramBuilder::new();
    let a = builder.add_class("A", None, &[]);
    let m = builder.add_method(a, MethodDecl::new("m").make_static());
    let env = builder.build().unwrap();

    let mut body = BodyBuilder::new(m);
    body.push(Stmt::ReturnVoid);
    let body = body.build().unwrap();

    let implementation = translate(&env, &body);
    assert_eq!(
        implementation.body,
        vec![
            Statement::assign(
                &Ident::new("$exception", BoogieType::Ref),
                Ident::new("$null", BoogieType::Ref).expr()
            ),
            Statement::Return,
        ]
    );
    assert!(implementation.locals.is_empty());
}

#[test]
fn test_receiver_field_read() {
    let mut builder = ProgramBuilder::new();
    let a = builder.add_class("A", None, &[]);
    let f = builder.add_field(a, "f", Type::Int, false, vec![]);
    let get = builder.add_method(a, MethodDecl::new("get").returns(Type::Int));
    let env = builder.build().unwrap();

    let mut body = BodyBuilder::new(get);
    let this = body.add_local("this", Type::Class(a));
    let x = body.add_local("x", Type::Int);
    body.push(Stmt::Identity {
        local: this,
        rhs: Value::ThisRef,
    });
    body.push(Stmt::Assign {
        lhs: Value::Local(x),
        rhs: Value::field(Value::Local(this), f),
    });
    body.push(Stmt::Return(Value::Local(x)));
    let body = body.build().unwrap();

    // the receiver is never null-checked
    insta::assert_snapshot!(render(&translate(&env, &body)), @r###"
    assume $this != $null;
    $exception := $null;
    this := $this;
    x := $heap[this, A.f];
    $return := x;
    return;
    "###);
}

/// Follows a switch cascade for `key` and returns the label it jumps to.
fn eval_switch(statements: &[Statement], key: i64) -> String {
    match statements {
        [Statement::Goto(labels)] => labels[0].clone(),
        [Statement::If {
            condition: Expression::Binary {
                op: BinOp::Eq, rhs, ..
            },
            then_branch,
            else_branch,
        }] => {
            let Expression::IntLit(value) = rhs.as_ref() else {
                panic!("case value is not a literal: {}", rhs);
            };
            if *value == key {
                eval_switch(then_branch, key)
            } else {
                eval_switch(else_branch, key)
            }
        }
        other => panic!("unexpected switch shape: {:?}", other),
    }
}

/// Case values in the order the cascade tests them.
fn tested_cases(statements: &[Statement]) -> Vec<i64> {
    match statements {
        [Statement::If {
            condition: Expression::Binary { rhs, .. },
            else_branch,
            ..
        }] => {
            let mut cases = vec![];
            if let Expression::IntLit(value) = rhs.as_ref() {
                cases.push(*value);
            }
            cases.extend(tested_cases(else_branch));
            cases
        }
        _ => vec![],
    }
}

#[test]
fn test_lookup_switch_cascade() {
    let mut builder = ProgramBuilder::new();
    let a = builder.add_class("A", None, &[]);
    let m = builder.add_method(a, MethodDecl::new("m").make_static().param(Type::Int));
    let env = builder.build().unwrap();

    let mut body = BodyBuilder::new(m);
    let k = body.add_local("k", Type::Int);
    body.push(Stmt::Identity {
        local: k,
        rhs: Value::ParameterRef(0),
    });
    body.push(Stmt::LookupSwitch {
        key: Value::Local(k),
        cases: vec![(1, 2), (5, 3), (9, 4)],
        default: 5,
    });
    for _ in 2..6 {
        body.push(Stmt::ReturnVoid);
    }
    let body = body.build().unwrap();

    let implementation = translate(&env, &body);
    let start = implementation
        .body
        .iter()
        .position(|s| matches!(s, Statement::If { .. }))
        .unwrap();
    let cascade = &implementation.body[start..start + 1];

    assert_eq!(tested_cases(cascade), vec![9, 5, 1]);
    for (key, node) in [(1, 2), (5, 3), (9, 4), (42, 5)] {
        assert_eq!(eval_switch(cascade, key), label(m, node), "key {}", key);
    }
}

#[test]
fn test_table_switch_cases_start_at_low() {
    let mut builder = ProgramBuilder::new();
    let a = builder.add_class("A", None, &[]);
    let m = builder.add_method(a, MethodDecl::new("m").make_static().param(Type::Int));
    let env = builder.build().unwrap();

    let mut body = BodyBuilder::new(m);
    let k = body.add_local("k", Type::Int);
    body.push(Stmt::Identity {
        local: k,
        rhs: Value::ParameterRef(0),
    });
    body.push(Stmt::TableSwitch {
        key: Value::Local(k),
        low: 3,
        targets: vec![2, 3],
        default: 4,
    });
    for _ in 2..5 {
        body.push(Stmt::ReturnVoid);
    }
    let body = body.build().unwrap();

    let implementation = translate(&env, &body);
    let start = implementation
        .body
        .iter()
        .position(|s| matches!(s, Statement::If { .. }))
        .unwrap();
    let cascade = &implementation.body[start..start + 1];
    assert_eq!(eval_switch(cascade, 3), label(m, 2));
    assert_eq!(eval_switch(cascade, 4), label(m, 3));
    assert_eq!(eval_switch(cascade, 0), label(m, 4));
}

#[test]
fn test_empty_switch_jumps_to_default() {
    let mut builder = ProgramBuilder::new();
    let a = builder.add_class("A", None, &[]);
    let m = builder.add_method(a, MethodDecl::new("m").make_static().param(Type::Int));
    let env = builder.build().unwrap();

    let mut body = BodyBuilder::new(m);
    body.add_local("k", Type::Int);
    body.push(Stmt::TableSwitch {
        key: Value::Local(0),
        low: 0,
        targets: vec![],
        default: 1,
    });
    body.push(Stmt::ReturnVoid);
    let body = body.build().unwrap();

    let ctx = TranslationContext::new(&env, TranslationOptions::default());
    let implementation = translate_body(&ctx, &body).unwrap();
    assert!(!implementation.body.iter().any(|s| matches!(s, Statement::If { .. })));
    assert!(implementation.body.contains(&Statement::goto(label(m, 1))));
    assert_eq!(ctx.diagnostics().len(), 1);
    assert!(!ctx.has_errors());
}

/// Values whose non-null obligations are not implied by the statements before them.
fn open_non_null_obligations(statements: &[Statement]) -> Vec<String> {
    let null_compare = |e: &Expression| match e {
        Expression::Binary {
            op: BinOp::Neq,
            lhs,
            rhs,
        } => match (lhs.as_ref(), rhs.as_ref()) {
            (Expression::Ident(v), Expression::Ident(n)) if n.name == "$null" => Some(v.name.clone()),
            _ => None,
        },
        _ => None,
    };
    let mut non_null = BTreeSet::new();
    let mut open = vec![];
    for statement in statements {
        match statement {
            Statement::Assume(e) => non_null.extend(null_compare(e)),
            Statement::Assign { target, value } => {
                let known = matches!(value, Expression::Ident(src) if non_null.contains(&src.name));
                if known {
                    non_null.insert(target.name.clone());
                } else {
                    non_null.remove(&target.name);
                }
            }
            Statement::If {
                condition: Expression::Unary {
                    op: UnOp::Not,
                    operand,
                },
                ..
            } => {
                if let Some(value) = null_compare(operand) {
                    if !non_null.contains(&value) {
                        open.push(value.clone());
                    }
                    // the guard returns on null
                    non_null.insert(value);
                }
            }
            _ => {}
        }
    }
    open
}

#[test]
fn test_non_null_field_checks_written_value() {
    let mut builder = ProgramBuilder::new();
    let a = builder.add_class("A", None, &[]);
    let object = Type::Class(builder.object());
    let f = builder.add_field(a, "f", object.clone(), false, vec![Annotation::NonNull]);
    let m = builder.add_method(
        a,
        MethodDecl::new("m")
            .make_static()
            .param(Type::Class(a))
            .param(object.clone()),
    );
    let env = builder.build().unwrap();

    let mut body = BodyBuilder::new(m);
    let la = body.add_local("a", Type::Class(a));
    let lx = body.add_local("x", object.clone());
    let ly = body.add_local("y", object);
    body.push(Stmt::Identity {
        local: la,
        rhs: Value::ParameterRef(0),
    });
    body.push(Stmt::Identity {
        local: ly,
        rhs: Value::ParameterRef(1),
    });
    body.push(Stmt::Assign {
        lhs: Value::Local(lx),
        rhs: Value::New(env.object_class()),
    });
    body.push(Stmt::Assign {
        lhs: Value::field(Value::Local(la), f),
        rhs: Value::Local(lx),
    });
    body.push(Stmt::Assign {
        lhs: Value::field(Value::Local(la), f),
        rhs: Value::Local(ly),
    });
    body.push(Stmt::ReturnVoid);
    let body = body.build().unwrap();

    let implementation = translate(&env, &body);
    // `a` is checked on its first dereference; of the two written values only `y` may be null
    assert_eq!(open_non_null_obligations(&implementation.body), vec!["a", "y"]);
    let rendered = render(&implementation);
    assert!(rendered.contains("$heap := $heap[a, A.f := x];"));
    assert!(rendered.contains("$heap := $heap[a, A.f := y];"));
}

#[test]
fn test_remainder_truncates() {
    let mut builder = ProgramBuilder::new();
    let a = builder.add_class("A", None, &[]);
    let m = builder.add_method(
        a,
        MethodDecl::new("m")
            .make_static()
            .param(Type::Int)
            .param(Type::Double),
    );
    let env = builder.build().unwrap();

    let mut body = BodyBuilder::new(m);
    let i = body.add_local("i", Type::Int);
    let d = body.add_local("d", Type::Double);
    body.push(Stmt::Identity {
        local: i,
        rhs: Value::ParameterRef(0),
    });
    body.push(Stmt::Identity {
        local: d,
        rhs: Value::ParameterRef(1),
    });
    body.push(Stmt::Assign {
        lhs: Value::Local(i),
        rhs: Value::binary(BinaryOp::Rem, Value::Local(i), Value::int(-3)),
    });
    body.push(Stmt::Assign {
        lhs: Value::Local(d),
        rhs: Value::binary(BinaryOp::Rem, Value::Local(d), Value::Local(d)),
    });
    body.push(Stmt::ReturnVoid);
    let body = body.build().unwrap();

    let rendered = render(&translate(&env, &body));
    assert!(rendered.contains("i := $remInt(i, -3);"), "{}", rendered);
    assert!(rendered.contains("d := $remReal(d, d);"), "{}", rendered);
    assert!(!rendered.contains(" mod "), "{}", rendered);
}

#[test]
fn test_array_access_obligations() {
    let mut builder = ProgramBuilder::new();
    let a = builder.add_class("A", None, &[]);
    let ints = Type::array_of(Type::Int);
    let m = builder.add_method(
        a,
        MethodDecl::new("m")
            .make_static()
            .param(ints.clone())
            .param(Type::Int),
    );
    let env = builder.build().unwrap();

    let mut body = BodyBuilder::new(m);
    let arr = body.add_local("arr", ints);
    let i = body.add_local("i", Type::Int);
    let x = body.add_local("x", Type::Int);
    body.push(Stmt::Identity {
        local: arr,
        rhs: Value::ParameterRef(0),
    });
    body.push(Stmt::Identity {
        local: i,
        rhs: Value::ParameterRef(1),
    });
    body.push(Stmt::Assign {
        lhs: Value::Local(x),
        rhs: Value::element(Value::Local(arr), Value::Local(i)),
    });
    body.push(Stmt::Assign {
        lhs: Value::element(Value::Local(arr), Value::int(0)),
        rhs: Value::Local(x),
    });
    body.push(Stmt::ReturnVoid);
    let body = body.build().unwrap();

    let options = TranslationOptions {
        error_model: ErrorModel::Assertion,
        ..TranslationOptions::default()
    };
    insta::assert_snapshot!(render(&translate_with(&env, &body, options)), @r###"
    $exception := $null;
    arr := $in_parameter__0;
    i := $in_parameter__1;
    assert arr != $null;
    assert (0 <= i) && (i < $arrSizeHeap[arr]);
    x := $intArrHeap[arr][i];
    assert arr != $null;
    assert (0 <= 0) && (0 < $arrSizeHeap[arr]);
    $intArrHeap := $intArrHeap[arr := $intArrHeap[arr][0 := x]];
    return;
    "###);

    let options = TranslationOptions {
        error_model: ErrorModel::Assertion,
        no_array_bounds_checks: true,
        ..TranslationOptions::default()
    };
    let rendered = render(&translate_with(&env, &body, options));
    assert!(!rendered.contains("$arrSizeHeap"));
    assert_eq!(rendered.matches("assert arr != $null;").count(), 2);
}

#[test]
fn test_allocations() {
    let mut builder = ProgramBuilder::new();
    let a = builder.add_class("A", None, &[]);
    let m = builder.add_method(a, MethodDecl::new("m").make_static());
    let env = builder.build().unwrap();

    let string = Type::Class(env.string_class());
    let mut body = BodyBuilder::new(m);
    let s = body.add_local("s", string);
    let arr = body.add_local("arr", Type::array_of(Type::Bool));
    let grid = body.add_local("grid", Type::array_of(Type::array_of(Type::Int)));
    body.push(Stmt::Assign {
        lhs: Value::Local(s),
        rhs: Value::string("héllo"),
    });
    body.push(Stmt::Assign {
        lhs: Value::Local(arr),
        rhs: Value::NewArray {
            elem: Type::Bool,
            size: Box::new(Value::int(3)),
        },
    });
    body.push(Stmt::Assign {
        lhs: Value::Local(grid),
        rhs: Value::NewMultiArray {
            ty: Type::array_of(Type::array_of(Type::Int)),
            sizes: vec![Value::int(2), Value::int(4)],
        },
    });
    body.push(Stmt::ReturnVoid);
    let body = body.build().unwrap();

    let ctx = TranslationContext::new(&env, TranslationOptions::default());
    let implementation = translate_body(&ctx, &body).unwrap();
    insta::assert_snapshot!(render(&implementation), @r###"
    $exception := $null;
    havoc $fakelocal_0;
    assume !$heap[$fakelocal_0, $alloc];
    $heap := $heap[$fakelocal_0, $alloc := true];
    assume $fakelocal_0 != $null;
    $heap := $heap[$fakelocal_0, $type := $type_java.lang.String];
    $stringSizeHeap := $stringSizeHeap[$fakelocal_0 := 5];
    s := $fakelocal_0;
    havoc $fakelocal_1;
    assume !$heap[$fakelocal_1, $alloc];
    $heap := $heap[$fakelocal_1, $alloc := true];
    assume $fakelocal_1 != $null;
    $heap := $heap[$fakelocal_1, $type := $type_boolean$arr];
    $arrSizeHeap := $arrSizeHeap[$fakelocal_1 := 3];
    arr := $fakelocal_1;
    havoc $freshglobal_0;
    assume !$heap[$freshglobal_0, $alloc];
    $heap := $heap[$freshglobal_0, $alloc := true];
    assume $freshglobal_0 != $null;
    $heap := $heap[$freshglobal_0, $type := $type_int$arr$arr];
    grid := $freshglobal_0;
    return;
    "###);
    assert_eq!(ctx.fresh_globals().len(), 1);
}

#[test]
fn test_throw_to_single_handler() {
    let mut builder = ProgramBuilder::new();
    let a = builder.add_class("A", None, &[]);
    let exc = builder.add_class("Exc", Some(builder.throwable()), &[]);
    let m = builder.add_method(a, MethodDecl::new("m").make_static());
    let env = builder.build().unwrap();

    let mut body = BodyBuilder::new(m);
    let e = body.add_local("e", Type::Class(exc));
    body.push(Stmt::Assign {
        lhs: Value::Local(e),
        rhs: Value::New(exc),
    });
    body.push(Stmt::Throw(Value::Local(e)));
    body.push(Stmt::Identity {
        local: e,
        rhs: Value::CaughtExceptionRef,
    });
    body.push(Stmt::ReturnVoid);
    body.add_trap(0, 2, exc, 2);
    let body = body.build().unwrap();

    let rendered = render(&translate(&env, &body));
    let expected = format!(
        "$exception := e;\ngoto {0};\n{0}:\ne := $exception;\n$exception := $null;\nreturn;",
        label(m, 2)
    );
    assert!(rendered.ends_with(&expected), "{}", rendered);
}

#[test]
fn test_throw_with_several_handlers() {
    let mut builder = ProgramBuilder::new();
    let a = builder.add_class("A", None, &[]);
    let exc = builder.add_class("Exc", Some(builder.throwable()), &[]);
    let m = builder.add_method(a, MethodDecl::new("m").make_static());
    let env = builder.build().unwrap();

    let mut body = BodyBuilder::new(m);
    let e = body.add_local("e", Type::Class(env.throwable_class()));
    body.push(Stmt::Assign {
        lhs: Value::Local(e),
        rhs: Value::New(exc),
    });
    body.push(Stmt::Throw(Value::Local(e)));
    body.push(Stmt::Identity {
        local: e,
        rhs: Value::CaughtExceptionRef,
    });
    body.push(Stmt::ReturnVoid);
    body.push(Stmt::Identity {
        local: e,
        rhs: Value::CaughtExceptionRef,
    });
    body.push(Stmt::ReturnVoid);
    body.add_trap(0, 2, exc, 2);
    body.add_trap(0, 2, env.throwable_class(), 4);
    let body = body.build().unwrap();

    let implementation = translate(&env, &body);
    let rendered = render(&implementation);
    let expected = format!(
        "$exception := e;\n\
         if ($heap[$exception, $type] <: $type_Exc) {{\n    goto {};\n}}\n\
         if ($heap[$exception, $type] <: $type_java.lang.Throwable) {{\n    goto {};\n}}\n\
         return;",
        label(m, 2),
        label(m, 4)
    );
    assert!(rendered.contains(&expected), "{}", rendered);
}

#[test]
fn test_multi_catch_handler_receives_every_caught_type() {
    // try { throw e; } catch (EA | EB e) { .. } catch (EC e) { .. }
    let mut builder = ProgramBuilder::new();
    let a = builder.add_class("A", None, &[]);
    let ea = builder.add_class("EA", Some(builder.throwable()), &[]);
    let eb = builder.add_class("EB", Some(builder.throwable()), &[]);
    let ec = builder.add_class("EC", Some(builder.throwable()), &[]);
    let m = builder.add_method(a, MethodDecl::new("m").make_static());
    let env = builder.build().unwrap();

    let mut body = BodyBuilder::new(m);
    let e = body.add_local("e", Type::Class(env.throwable_class()));
    body.push(Stmt::Assign {
        lhs: Value::Local(e),
        rhs: Value::New(eb),
    });
    body.push(Stmt::Throw(Value::Local(e)));
    body.push(Stmt::Identity {
        local: e,
        rhs: Value::CaughtExceptionRef,
    });
    body.push(Stmt::ReturnVoid);
    body.push(Stmt::Identity {
        local: e,
        rhs: Value::CaughtExceptionRef,
    });
    body.push(Stmt::ReturnVoid);
    body.add_trap(0, 2, ea, 2);
    body.add_trap(0, 2, eb, 2);
    body.add_trap(0, 2, ec, 4);
    let body = body.build().unwrap();

    let rendered = render(&translate(&env, &body));
    let expected = format!(
        "$exception := e;\n\
         if ($heap[$exception, $type] <: $type_EA) {{\n    goto {h1};\n}}\n\
         if ($heap[$exception, $type] <: $type_EB) {{\n    goto {h1};\n}}\n\
         if ($heap[$exception, $type] <: $type_EC) {{\n    goto {h2};\n}}\n\
         return;",
        h1 = label(m, 2),
        h2 = label(m, 4)
    );
    assert!(rendered.contains(&expected), "{}", rendered);
}

#[test]
fn test_uncaught_throw_returns() {
    let mut builder = ProgramBuilder::new();
    let a = builder.add_class("A", None, &[]);
    let m = builder.add_method(a, MethodDecl::new("m").make_static());
    let env = builder.build().unwrap();

    let mut body = BodyBuilder::new(m);
    body.push(Stmt::Throw(Value::Constant(Constant::Null)));
    let body = body.build().unwrap();

    insta::assert_snapshot!(render(&translate(&env, &body)), @r###"
    $exception := $null;
    $exception := $null;
    return;
    "###);
}

#[test]
fn test_throw_into_non_handler_fails() {
    let mut builder = ProgramBuilder::new();
    let a = builder.add_class("A", None, &[]);
    let m = builder.add_method(a, MethodDecl::new("m").make_static());
    let env = builder.build().unwrap();

    let mut body = BodyBuilder::new(m);
    body.push(Stmt::Throw(Value::Constant(Constant::Null)));
    body.push(Stmt::ReturnVoid);
    body.add_trap(0, 1, env.throwable_class(), 1);
    let body = body.build().unwrap();

    let ctx = TranslationContext::new(&env, TranslationOptions::default());
    let err = translate_body(&ctx, &body).unwrap_err();
    let msg = format!("{:#}", err);
    assert!(msg.contains("while translating `A.m` at node 0"), "{}", msg);
    assert!(msg.contains("is not an exception handler"), "{}", msg);
}

#[test]
fn test_unsupported_left_hand_side_fails() {
    let mut builder = ProgramBuilder::new();
    let a = builder.add_class("A", None, &[]);
    let m = builder.add_method(a, MethodDecl::new("m").make_static());
    let env = builder.build().unwrap();

    let mut body = BodyBuilder::new(m);
    body.push(Stmt::Assign {
        lhs: Value::int(1),
        rhs: Value::int(2),
    });
    let body = body.build().unwrap();

    let ctx = TranslationContext::new(&env, TranslationOptions::default());
    let err = translate_body(&ctx, &body).unwrap_err();
    assert!(format!("{:#}", err).contains("unsupported left-hand side"));
}

#[test]
fn test_subroutine_return_is_unexpected_violation() {
    let mut builder = ProgramBuilder::new();
    let a = builder.add_class("A", None, &[]);
    let m = builder.add_method(a, MethodDecl::new("m").make_static());
    let env = builder.build().unwrap();

    let mut body = BodyBuilder::new(m);
    let r = body.add_local("r", Type::Int);
    body.push(Stmt::Ret(r));
    let body = body.build().unwrap();

    let ctx = TranslationContext::new(&env, TranslationOptions::default());
    let implementation = translate_body(&ctx, &body).unwrap();
    insta::assert_snapshot!(render(&implementation), @r###"
    $exception := $null;
    $ex_return := false;
    $ex_return := true;
    $exception := $exUnexpected;
    return;
    "###);
    assert_eq!(ctx.diagnostics().len(), 1);
}

#[test]
fn test_translation_is_deterministic() {
    let mut builder = ProgramBuilder::new();
    let a = builder.add_class("A", None, &[]);
    let f = builder.add_field(a, "next", Type::Class(a), false, vec![]);
    let m = builder.add_method(a, MethodDecl::new("m").make_static().param(Type::Class(a)));
    let env = builder.build().unwrap();

    let mut body = BodyBuilder::new(m);
    let p = body.add_local("p", Type::Class(a));
    let q = body.add_local("q", Type::Class(a));
    body.push(Stmt::Identity {
        local: p,
        rhs: Value::ParameterRef(0),
    });
    body.push(Stmt::Assign {
        lhs: Value::Local(q),
        rhs: Value::New(a),
    });
    body.push(Stmt::Assign {
        lhs: Value::field(Value::Local(q), f),
        rhs: Value::Local(p),
    });
    body.push(Stmt::If {
        cond: Value::binary(BinaryOp::Eq, Value::Local(p), Value::null()),
        target: 1,
    });
    body.push(Stmt::ReturnVoid);
    let body = body.build().unwrap();

    let first = translate(&env, &body);
    let second = translate(&env, &body);
    assert_eq!(first, second);
    assert_eq!(render(&first), render(&second));
}
