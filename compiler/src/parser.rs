// Parser for `.nrl` reflection-library files.
//
// Parses a token stream (from the lexer) into an AST. Uses chumsky
// combinators.
//
// Preconditions: input is a valid token stream from `lexer::lex()`.
// Postconditions: returns an AST plus any parse errors (non-fatal).
// Failure modes: syntax errors produce `Rich` diagnostics.
// Side effects: none.

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;
use chumsky::span::SimpleSpan;

use crate::ast::*;
use crate::lexer::Token;

/// Result of parsing: AST plus any errors.
#[derive(Debug)]
pub struct ParseResult {
    pub library: Option<LibraryFile>,
    pub errors: Vec<Rich<'static, Token, SimpleSpan>>,
}

/// Parse a library source string. Lexes then parses.
pub fn parse(source: &str) -> ParseResult {
    let lex_result = crate::lexer::lex(source);
    let len = source.len();

    let token_iter = lex_result.tokens.into_iter().map(|(tok, span)| {
        let cspan: SimpleSpan = (span.start..span.end).into();
        (tok, cspan)
    });
    let eoi: SimpleSpan = (len..len).into();
    let stream = Stream::from_iter(token_iter).map(eoi, |(t, s): (_, _)| (t, s));

    let parser = library_parser(source);
    let (library, parse_errors) = parser.parse(stream).into_output_errors();

    let mut all_errors: Vec<Rich<'static, Token, SimpleSpan>> = lex_result
        .errors
        .into_iter()
        .map(|e| {
            let span: SimpleSpan = (e.span.start..e.span.end).into();
            Rich::custom(span, e.message)
        })
        .collect();
    all_errors.extend(parse_errors.into_iter().map(|e| e.into_owned()));

    ParseResult {
        library,
        errors: all_errors,
    }
}

/// Render a parse error as `line:col: message` against its source.
pub fn describe_error(source: &str, error: &Rich<'static, Token, SimpleSpan>) -> String {
    let offset = error.span().start().min(source.len());
    let before = &source[..offset];
    let line = before.matches('\n').count() + 1;
    let col = offset - before.rfind('\n').map(|i| i + 1).unwrap_or(0) + 1;
    format!("{}:{}: {}", line, col, error)
}

// ── Main parser builder ──
//
// All grammar rules are built inside `library_parser` so that the `source`
// reference is captured once and shared by all combinators.

fn library_parser<'tokens, 'src: 'tokens, I>(
    source: &'src str,
) -> impl Parser<'tokens, I, LibraryFile, extra::Err<Rich<'tokens, Token, SimpleSpan>>> + 'src
where
    'tokens: 'src,
    I: ValueInput<'tokens, Token = Token, Span = SimpleSpan>,
{
    // ── Identifier ──

    let ident = just(Token::Ident).map_with(move |_, e| {
        let span: SimpleSpan = e.span();
        Ident {
            name: source[span.start()..span.end()].to_string(),
            span,
        }
    });

    // ── Literal ──

    let literal = select! {
        Token::Number(n) => Literal::Number(n),
        Token::StringLit(s) => Literal::Str(s),
    }
    .or(ident.clone().map(|id| Literal::Ident(id.name)));

    // ── Attributes: ('#[' attr (',' attr)* ']')* ──

    let attribute = ident
        .clone()
        .then(just(Token::Equals).ignore_then(literal.clone()).or_not())
        .map_with(|(name, value), e| Attribute {
            name,
            value: value.map(Literal::into_text),
            span: e.span(),
        });

    let attrs = attribute
        .separated_by(just(Token::Comma))
        .allow_trailing()
        .collect::<Vec<_>>()
        .delimited_by(just(Token::HashBracket), just(Token::RBracket))
        .repeated()
        .collect::<Vec<Vec<Attribute>>>()
        .map(|groups| groups.into_iter().flatten().collect::<Vec<_>>());

    // ── Type expression ──
    // `class`, `enum` and `delegate` are keywords but also type heads
    // (`class<Actor>`), so type words accept those tokens too.

    let type_word = just(Token::Ident)
        .or(just(Token::Class))
        .or(just(Token::Enum))
        .or(just(Token::Delegate))
        .map_with(move |_, e| {
            let span: SimpleSpan = e.span();
            source[span.start()..span.end()].to_string()
        });

    let generic_arg = type_word
        .clone()
        .then(
            type_word
                .clone()
                .delimited_by(just(Token::Lt), just(Token::Gt))
                .or_not(),
        )
        .map(|(head, arg)| match arg {
            Some(arg) => format!("{head}<{arg}>"),
            None => head,
        });

    let type_expr = type_word
        .clone()
        .then(
            generic_arg
                .delimited_by(just(Token::Lt), just(Token::Gt))
                .or_not(),
        )
        .map_with(|(head, arg), e| TypeExpr {
            text: match arg {
                Some(arg) => format!("{head}<{arg}>"),
                None => head,
            },
            span: e.span(),
        });

    // ── Parameters ──

    let param_mode = just(Token::Out)
        .to(ParamMode::Out)
        .or(just(Token::Ref).to(ParamMode::Ref))
        .or_not()
        .map(|mode| mode.unwrap_or(ParamMode::In));

    let param = attrs
        .clone()
        .then(param_mode)
        .then(ident.clone())
        .then_ignore(just(Token::Colon))
        .then(type_expr.clone())
        .then(just(Token::Equals).ignore_then(literal.clone()).or_not())
        .map_with(|((((attrs, mode), name), ty), default), e| ParamDecl {
            attrs,
            mode,
            name,
            ty,
            default,
            span: e.span(),
        });

    let params = param
        .separated_by(just(Token::Comma))
        .allow_trailing()
        .collect::<Vec<_>>()
        .delimited_by(just(Token::LParen), just(Token::RParen));

    // ── Function: attrs static? pure? fn IDENT params ('->' type)? ';' ──

    let fn_decl = attrs
        .clone()
        .then(just(Token::Static).or_not().map(|s| s.is_some()))
        .then(just(Token::Pure).or_not().map(|p| p.is_some()))
        .then_ignore(just(Token::Fn))
        .then(ident.clone())
        .then(params.clone())
        .then(just(Token::Arrow).ignore_then(type_expr.clone()).or_not())
        .then_ignore(just(Token::Semi))
        .map_with(
            |(((((attrs, is_static), is_pure), name), params), ret), e| FnDecl {
                attrs,
                is_static,
                is_pure,
                name,
                params,
                ret,
                span: e.span(),
            },
        );

    // ── Property: attrs prop IDENT ':' type ('=' literal)? ';' ──

    let prop_decl = attrs
        .clone()
        .then_ignore(just(Token::Prop))
        .then(ident.clone())
        .then_ignore(just(Token::Colon))
        .then(type_expr.clone())
        .then(just(Token::Equals).ignore_then(literal).or_not())
        .then_ignore(just(Token::Semi))
        .map_with(|(((attrs, name), ty), default), e| PropDecl {
            attrs,
            name,
            ty,
            default,
            span: e.span(),
        });

    // ── Items ──

    let member = prop_decl.map(Member::Prop).or(fn_decl.clone().map(Member::Fn));

    let class_decl = just(Token::Class)
        .ignore_then(ident.clone())
        .then(just(Token::Colon).ignore_then(ident.clone()).or_not())
        .then(
            member
                .repeated()
                .collect::<Vec<_>>()
                .delimited_by(just(Token::LBrace), just(Token::RBrace)),
        )
        .map(|((name, parent), members)| {
            ItemKind::Class(ClassDecl {
                name,
                parent,
                members,
            })
        });

    let library_decl = just(Token::Library)
        .ignore_then(ident.clone())
        .then(
            fn_decl
                .repeated()
                .collect::<Vec<_>>()
                .delimited_by(just(Token::LBrace), just(Token::RBrace)),
        )
        .map(|(name, functions)| ItemKind::Library(LibraryDecl { name, functions }));

    let enum_decl = just(Token::Enum)
        .ignore_then(ident.clone())
        .then(
            ident
                .clone()
                .separated_by(just(Token::Comma))
                .allow_trailing()
                .collect::<Vec<_>>()
                .delimited_by(just(Token::LBrace), just(Token::RBrace)),
        )
        .map(|(name, variants)| ItemKind::Enum(EnumDecl { name, variants }));

    let delegate_decl = just(Token::Delegate)
        .ignore_then(ident)
        .then(params)
        .then(just(Token::Arrow).ignore_then(type_expr).or_not())
        .then_ignore(just(Token::Semi))
        .map(|((name, params), ret)| ItemKind::Delegate(DelegateDecl { name, params, ret }));

    let item = attrs
        .then(choice((class_decl, library_decl, enum_decl, delegate_decl)))
        .map_with(|(attrs, kind), e| Item {
            attrs,
            kind,
            span: e.span(),
        });

    // ── Library file ──

    item.repeated()
        .collect::<Vec<_>>()
        .then_ignore(end())
        .map_with(|items, e| LibraryFile {
            items,
            span: e.span(),
        })
}

// ── Tests ──
