//! The grammar: one function per rule, recursive descent.
//!
//! Statements are keyword-led, so a single token of lookahead picks the
//! rule almost everywhere; CASE arm starts are recognised by attempting
//! `expression ":"` and backing off. Blocks inside FUNCTION bodies are
//! flagged so the executor knows a RETURN signal may propagate out of
//! them.

use crate::ast::{
    BinOp, Block, Expr, FuncDef, LValue, Param, Program, Stmt, TypeDesc, UnaryOp,
};
use crate::lexer::TokenKind;
use crate::types::Primitive;

use super::state::{ParseError, ParseResult, ParseState};

/// program := statement*
pub fn parse(state: &mut ParseState) -> ParseResult<Program> {
    let mut stmts = Vec::new();
    while state.has_next() {
        stmts.push(statement(state, false)?);
    }
    Ok(Program { stmts })
}

/// Keywords that close the block of an enclosing construct.
fn at_block_end(state: &ParseState) -> bool {
    matches!(
        state.peek_kind(),
        Some(
            TokenKind::EndIf
                | TokenKind::Else
                | TokenKind::EndWhile
                | TokenKind::Until
                | TokenKind::Next
                | TokenKind::EndCase
                | TokenKind::Otherwise
                | TokenKind::EndProcedure
                | TokenKind::EndFunction
        )
    )
}

/// block := statement*  (up to the enclosing construct's closing keyword)
fn block(state: &mut ParseState, in_func: bool) -> ParseResult<Block> {
    let mut stmts = Vec::new();
    while state.has_next() && !at_block_end(state) {
        stmts.push(statement(state, in_func)?);
    }
    Ok(Block { stmts, is_func: in_func })
}

/// statement := declare | constant | procedure | function | input | output
///            | if | case | for | repeat | while | call | return | assign
fn statement(state: &mut ParseState, in_func: bool) -> ParseResult<Stmt> {
    match state.peek_kind() {
        Some(TokenKind::Declare) => declare(state),
        Some(TokenKind::Constant) => constant(state),
        Some(TokenKind::Procedure) => procedure(state),
        Some(TokenKind::Function) => function(state),
        Some(TokenKind::Input) => {
            state.advance();
            let lvalue = lvalue(state)?;
            Ok(Stmt::Input { lvalue })
        }
        Some(TokenKind::Output) => output(state),
        Some(TokenKind::If) => if_statement(state, in_func),
        Some(TokenKind::Case) => case_statement(state, in_func),
        Some(TokenKind::For) => for_statement(state, in_func),
        Some(TokenKind::Repeat) => repeat_statement(state, in_func),
        Some(TokenKind::While) => while_statement(state, in_func),
        Some(TokenKind::Call) => call_statement(state),
        Some(TokenKind::Return) => return_statement(state, in_func),
        Some(TokenKind::Identifier(_)) => assignment(state),
        _ => Err(state.error_expected("a statement")),
    }
}

/// declare := DECLARE identifier ":" type
fn declare(state: &mut ParseState) -> ParseResult<Stmt> {
    state.advance();
    let id = state.expect_identifier()?;
    state.expect(&TokenKind::Colon)?;
    let typ = type_desc(state)?;
    Ok(Stmt::Declare { id, typ })
}

/// constant := CONSTANT identifier ("=" | "<-") expression
fn constant(state: &mut ParseState) -> ParseResult<Stmt> {
    state.advance();
    let id = state.expect_identifier()?;
    if !state.eat(&TokenKind::Eq) {
        state.expect(&TokenKind::Assign)?;
    }
    let expr = expression(state)?;
    Ok(Stmt::Constant { id, expr })
}

/// procedure := PROCEDURE identifier ["(" params ")"] block ENDPROCEDURE
fn procedure(state: &mut ParseState) -> ParseResult<Stmt> {
    state.advance();
    let id = state.expect_identifier()?;
    let params = param_list(state)?;
    let body = block(state, false)?;
    state.expect(&TokenKind::EndProcedure)?;
    Ok(Stmt::Procedure(FuncDef {
        id,
        params,
        ret: None,
        body,
    }))
}

/// function := FUNCTION identifier ["(" params ")"] RETURNS type
///             block ENDFUNCTION
fn function(state: &mut ParseState) -> ParseResult<Stmt> {
    state.advance();
    let id = state.expect_identifier()?;
    let params = param_list(state)?;
    state.expect(&TokenKind::Returns)?;
    let ret = type_desc(state)?;
    let body = block(state, true)?;
    state.expect(&TokenKind::EndFunction)?;
    Ok(Stmt::Function(FuncDef {
        id,
        params,
        ret: Some(ret),
        body,
    }))
}

/// params := param ("," param)*
/// param  := [BYREF] identifier ":" type
fn param_list(state: &mut ParseState) -> ParseResult<Vec<Param>> {
    let mut params = Vec::new();
    if !state.eat(&TokenKind::LeftParen) {
        return Ok(params);
    }
    if state.eat(&TokenKind::RightParen) {
        return Ok(params);
    }
    loop {
        let byref = state.eat(&TokenKind::ByRef);
        let id = state.expect_identifier()?;
        state.expect(&TokenKind::Colon)?;
        let typ = type_desc(state)?;
        params.push(Param { id, typ, byref });
        if !state.eat(&TokenKind::Comma) {
            break;
        }
    }
    state.expect(&TokenKind::RightParen)?;
    Ok(params)
}

/// output := OUTPUT expression ("," expression)*
fn output(state: &mut ParseState) -> ParseResult<Stmt> {
    state.advance();
    let mut exprs = vec![expression(state)?];
    while state.eat(&TokenKind::Comma) {
        exprs.push(expression(state)?);
    }
    Ok(Stmt::Output { exprs })
}

/// if := IF expression THEN block [ELSE block] ENDIF
fn if_statement(state: &mut ParseState, in_func: bool) -> ParseResult<Stmt> {
    state.advance();
    let cond = expression(state)?;
    state.expect(&TokenKind::Then)?;
    let then_block = block(state, in_func)?;
    let else_block = if state.eat(&TokenKind::Else) {
        Some(block(state, in_func)?)
    } else {
        None
    };
    state.expect(&TokenKind::EndIf)?;
    Ok(Stmt::If {
        cond,
        then_block,
        else_block,
    })
}

/// Does `expression ":"` start here? Used to find the next CASE arm.
fn at_arm_start(state: &mut ParseState) -> bool {
    let position = state.position();
    let is_arm = expression(state).is_ok() && state.eat(&TokenKind::Colon);
    state.restore(position);
    is_arm
}

/// arm_block := statement*  (up to the next arm, OTHERWISE or ENDCASE)
fn arm_block(state: &mut ParseState, in_func: bool) -> ParseResult<Block> {
    let mut stmts = Vec::new();
    while state.has_next() && !at_block_end(state) && !at_arm_start(state) {
        stmts.push(statement(state, in_func)?);
    }
    Ok(Block { stmts, is_func: in_func })
}

/// case := CASE OF lvalue (expression ":" arm_block)*
///         [OTHERWISE [":"] block] ENDCASE
fn case_statement(state: &mut ParseState, in_func: bool) -> ParseResult<Stmt> {
    state.advance();
    state.expect(&TokenKind::Of)?;
    let subject = lvalue(state)?;
    let mut arms = Vec::new();
    while !state.check(&TokenKind::EndCase) && !state.check(&TokenKind::Otherwise) {
        let label = expression(state)?;
        state.expect(&TokenKind::Colon)?;
        let body = arm_block(state, in_func)?;
        arms.push((label, body));
    }
    let otherwise = if state.eat(&TokenKind::Otherwise) {
        state.eat(&TokenKind::Colon);
        Some(block(state, in_func)?)
    } else {
        None
    };
    state.expect(&TokenKind::EndCase)?;
    Ok(Stmt::Case {
        subject,
        arms,
        otherwise,
    })
}

/// for := FOR identifier "<-" expression TO expression [STEP expression]
///        block NEXT [identifier]
fn for_statement(state: &mut ParseState, in_func: bool) -> ParseResult<Stmt> {
    state.advance();
    let id = state.expect_identifier()?;
    state.expect(&TokenKind::Assign)?;
    let start = expression(state)?;
    state.expect(&TokenKind::To)?;
    let end = expression(state)?;
    let step = if state.eat(&TokenKind::Step) {
        Some(expression(state)?)
    } else {
        None
    };
    let body = block(state, in_func)?;
    state.expect(&TokenKind::Next)?;
    if let Some(TokenKind::Identifier(_)) = state.peek_kind() {
        state.advance();
    }
    Ok(Stmt::For {
        id,
        start,
        end,
        step,
        body,
    })
}

/// repeat := REPEAT block UNTIL expression
fn repeat_statement(state: &mut ParseState, in_func: bool) -> ParseResult<Stmt> {
    state.advance();
    let body = block(state, in_func)?;
    state.expect(&TokenKind::Until)?;
    let until = expression(state)?;
    Ok(Stmt::Repeat { body, until })
}

/// while := WHILE expression block ENDWHILE
fn while_statement(state: &mut ParseState, in_func: bool) -> ParseResult<Stmt> {
    state.advance();
    let cond = expression(state)?;
    let body = block(state, in_func)?;
    state.expect(&TokenKind::EndWhile)?;
    Ok(Stmt::While { cond, body })
}

/// call := CALL identifier ["(" args ")"]
fn call_statement(state: &mut ParseState) -> ParseResult<Stmt> {
    state.advance();
    let id = state.expect_identifier()?;
    let args = if state.eat(&TokenKind::LeftParen) {
        call_args(state)?
    } else {
        Vec::new()
    };
    Ok(Stmt::CallProc { id, args })
}

/// return := RETURN expression
fn return_statement(state: &mut ParseState, in_func: bool) -> ParseResult<Stmt> {
    if !in_func {
        let (line, col) = state
            .peek()
            .map(|token| (token.line, token.col))
            .unwrap_or((0, 0));
        return Err(ParseError::ReturnOutsideFunction { line, col });
    }
    state.advance();
    let expr = expression(state)?;
    Ok(Stmt::Return { expr })
}

/// assign := lvalue "<-" expression
fn assignment(state: &mut ParseState) -> ParseResult<Stmt> {
    let lvalue = lvalue(state)?;
    state.expect(&TokenKind::Assign)?;
    let expr = expression(state)?;
    Ok(Stmt::Assign { lvalue, expr })
}

/// lvalue := identifier ["[" expression ("," expression)* "]"]
fn lvalue(state: &mut ParseState) -> ParseResult<LValue> {
    let id = state.expect_identifier()?;
    let mut indexes = Vec::new();
    if state.eat(&TokenKind::LeftSquare) {
        indexes.push(expression(state)?);
        while state.eat(&TokenKind::Comma) {
            indexes.push(expression(state)?);
        }
        state.expect(&TokenKind::RightSquare)?;
    }
    Ok(LValue { id, indexes })
}

/// type := INTEGER | REAL | STRING | CHAR | BOOLEAN | DATE
///       | ARRAY "[" expression ":" expression
///         ("," expression ":" expression)* "]" OF type
fn type_desc(state: &mut ParseState) -> ParseResult<TypeDesc> {
    let primitive = match state.peek_kind() {
        Some(TokenKind::Integer) => Some(Primitive::Integer),
        Some(TokenKind::Real) => Some(Primitive::Real),
        Some(TokenKind::String) => Some(Primitive::String),
        Some(TokenKind::Char) => Some(Primitive::Char),
        Some(TokenKind::Boolean) => Some(Primitive::Boolean),
        Some(TokenKind::Date) => Some(Primitive::Date),
        _ => None,
    };
    if let Some(primitive) = primitive {
        state.advance();
        return Ok(TypeDesc::Prim(primitive));
    }
    if !state.check(&TokenKind::Array) {
        return Err(state.error_expected("a type"));
    }
    state.advance();
    state.expect(&TokenKind::LeftSquare)?;
    let mut bounds = Vec::new();
    loop {
        let start = expression(state)?;
        state.expect(&TokenKind::Colon)?;
        let end = expression(state)?;
        bounds.push((start, end));
        if !state.eat(&TokenKind::Comma) {
            break;
        }
    }
    state.expect(&TokenKind::RightSquare)?;
    state.expect(&TokenKind::Of)?;
    let mut desc = type_desc(state)?;
    // A bound list is sugar for nesting: fold inside-out.
    for (start, end) in bounds.into_iter().rev() {
        desc = TypeDesc::Array {
            start: Box::new(start),
            end: Box::new(end),
            elem: Box::new(desc),
        };
    }
    Ok(desc)
}

/// args := [expression ("," expression)*] ")"
fn call_args(state: &mut ParseState) -> ParseResult<Vec<Expr>> {
    let mut args = Vec::new();
    if state.eat(&TokenKind::RightParen) {
        return Ok(args);
    }
    args.push(expression(state)?);
    while state.eat(&TokenKind::Comma) {
        args.push(expression(state)?);
    }
    state.expect(&TokenKind::RightParen)?;
    Ok(args)
}

/// expression := and_expr (OR and_expr)*
pub(super) fn expression(state: &mut ParseState) -> ParseResult<Expr> {
    let mut left = and_expr(state)?;
    while state.eat(&TokenKind::Or) {
        let right = and_expr(state)?;
        left = binary(BinOp::Or, left, right);
    }
    Ok(left)
}

/// and_expr := comparison (AND comparison)*
fn and_expr(state: &mut ParseState) -> ParseResult<Expr> {
    let mut left = comparison(state)?;
    while state.eat(&TokenKind::And) {
        let right = comparison(state)?;
        left = binary(BinOp::And, left, right);
    }
    Ok(left)
}

/// comparison := sum [("=" | "<>" | "<" | "<=" | ">" | ">=") sum]
fn comparison(state: &mut ParseState) -> ParseResult<Expr> {
    let left = sum(state)?;
    let op = match state.peek_kind() {
        Some(TokenKind::Eq) => Some(BinOp::Eq),
        Some(TokenKind::NotEq) => Some(BinOp::NotEq),
        Some(TokenKind::Less) => Some(BinOp::Less),
        Some(TokenKind::LessEq) => Some(BinOp::LessEq),
        Some(TokenKind::Greater) => Some(BinOp::Greater),
        Some(TokenKind::GreaterEq) => Some(BinOp::GreaterEq),
        _ => None,
    };
    match op {
        Some(op) => {
            state.advance();
            let right = sum(state)?;
            Ok(binary(op, left, right))
        }
        None => Ok(left),
    }
}

/// sum := term (("+" | "-") term)*
fn sum(state: &mut ParseState) -> ParseResult<Expr> {
    let mut left = term(state)?;
    loop {
        let op = match state.peek_kind() {
            Some(TokenKind::Plus) => BinOp::Add,
            Some(TokenKind::Minus) => BinOp::Sub,
            _ => break,
        };
        state.advance();
        let right = term(state)?;
        left = binary(op, left, right);
    }
    Ok(left)
}

/// term := unary (("*" | "/" | DIV | MOD) unary)*
fn term(state: &mut ParseState) -> ParseResult<Expr> {
    let mut left = unary(state)?;
    loop {
        let op = match state.peek_kind() {
            Some(TokenKind::Star) => BinOp::Mul,
            Some(TokenKind::Slash) => BinOp::Div,
            Some(TokenKind::Div) => BinOp::IntDiv,
            Some(TokenKind::Mod) => BinOp::Mod,
            _ => break,
        };
        state.advance();
        let right = unary(state)?;
        left = binary(op, left, right);
    }
    Ok(left)
}

/// unary := (NOT | "-") unary | primary
fn unary(state: &mut ParseState) -> ParseResult<Expr> {
    if state.eat(&TokenKind::Not) {
        let operand = unary(state)?;
        return Ok(Expr::Unary {
            op: UnaryOp::Not,
            operand: Box::new(operand),
        });
    }
    if state.eat(&TokenKind::Minus) {
        let operand = unary(state)?;
        return Ok(Expr::Unary {
            op: UnaryOp::Neg,
            operand: Box::new(operand),
        });
    }
    primary(state)
}

/// primary := INT_C | REAL_C | STR_C | TRUE | FALSE | "(" expression ")"
///          | identifier "(" args ")" | lvalue
fn primary(state: &mut ParseState) -> ParseResult<Expr> {
    match state.peek_kind() {
        Some(TokenKind::IntConst(value)) => {
            let value = *value;
            state.advance();
            Ok(Expr::IntLit(value))
        }
        Some(TokenKind::RealConst(value)) => {
            let value = *value;
            state.advance();
            Ok(Expr::RealLit(value))
        }
        Some(TokenKind::StrConst(value)) => {
            let value = value.clone();
            state.advance();
            Ok(Expr::StrLit(value))
        }
        Some(TokenKind::True) => {
            state.advance();
            Ok(Expr::BoolLit(true))
        }
        Some(TokenKind::False) => {
            state.advance();
            Ok(Expr::BoolLit(false))
        }
        Some(TokenKind::LeftParen) => {
            state.advance();
            let inner = expression(state)?;
            state.expect(&TokenKind::RightParen)?;
            Ok(inner)
        }
        Some(TokenKind::Identifier(id)) => {
            let id = *id;
            if state.peek2_kind() == Some(&TokenKind::LeftParen) {
                state.advance();
                state.advance();
                let args = call_args(state)?;
                Ok(Expr::Call { func: id, args })
            } else {
                Ok(Expr::LValue(lvalue(state)?))
            }
        }
        _ => Err(state.error_expected("an expression")),
    }
}

fn binary(op: BinOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}
