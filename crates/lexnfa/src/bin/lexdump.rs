//! Dump the compiled automaton of a small built-in grammar

#![deny(
    clippy::disallowed_methods,
    clippy::suspicious,
    clippy::style,
    clippy::clone_on_ref_ptr,
    missing_debug_implementations,
    missing_copy_implementations
)]
#![warn(clippy::pedantic, missing_docs)]
#![allow(clippy::module_name_repetitions)]

fn main() { entry::main(); }

mod entry {
    use anyhow::{Context, Result};
    use clap::Parser;
    use lexnfa::{
        LexerData, LexerGrammar, LexicalStateData, Scanner, TokenKind, TokenPattern,
        grammar::DEFAULT_STATE,
        lexical_state::NextState,
        re::{CharList, Regex},
    };
    use tracing_subscriber::{filter::LevelFilter, prelude::*};

    #[derive(Debug, Parser)]
    #[command(version, author, about)]
    struct Opts {
        /// Print more verbose logs
        #[arg(short, long, action = clap::ArgAction::Count)]
        verbose: u8,

        /// Match every pattern without regard to case
        #[arg(short, long)]
        ignore_case: bool,

        /// Lexical state to dump
        #[arg(long, default_value = DEFAULT_STATE)]
        state: String,

        /// Print a Graphviz digraph instead of a table
        #[arg(long)]
        dot: bool,

        /// Extra keyword literals, taking priority over the built-in patterns
        #[arg(long = "literal", value_name = "TEXT")]
        literals: Vec<String>,

        /// Text to tokenize with the compiled automaton
        input: Option<String>,
    }

    #[inline]
    pub fn main() {
        let opts = Opts::parse();

        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(match (cfg!(debug_assertions), opts.verbose) {
                (false, 0) => LevelFilter::INFO,
                (false, 1) | (true, 0) => LevelFilter::DEBUG,
                _ => LevelFilter::TRACE,
            })
            .init();

        tracing::debug!("{opts:#?}");

        std::process::exit(run(opts).map_or_else(
            |e| {
                tracing::error!("{e:?}");
                1
            },
            |()| 0,
        ));
    }

    fn demo_grammar(literals: Vec<String>, ignore_case: bool) -> LexerGrammar {
        let letter = || Regex::any_of(['a'..='z', 'A'..='Z', '_'..='_']);
        let digit = || Regex::reference("DIGIT");

        let keywords = literals.into_iter().map(TokenPattern::new);
        let builtin = [
            TokenPattern::new(Regex::any_of([' ', '\t', '\r', '\n']).plus()).kind(TokenKind::Skip),
            TokenPattern::labeled("OPEN_COMMENT", "/*")
                .kind(TokenKind::More)
                .switch_to("COMMENT"),
            TokenPattern::labeled("COMMENT", "*/")
                .kind(TokenKind::Unparsed)
                .in_states(["COMMENT"])
                .switch_to(DEFAULT_STATE),
            TokenPattern::labeled("COMMENT_BODY", CharList::negated(['*']))
                .kind(TokenKind::More)
                .in_states(["COMMENT"]),
            TokenPattern::labeled("COMMENT_STAR", "*")
                .kind(TokenKind::More)
                .in_states(["COMMENT"]),
            TokenPattern::labeled("DIGIT", Regex::any_of(['0'..='9'])).private(),
            TokenPattern::labeled(
                "NUMBER",
                Regex::Seq(vec![
                    digit().plus(),
                    Regex::Seq(vec![".".into(), digit().repeat(1, None)]).opt(),
                ]),
            ),
            TokenPattern::labeled(
                "HEX",
                Regex::Seq(vec![
                    "0x".into(),
                    Regex::any_of(['0'..='9', 'a'..='f', 'A'..='F']).repeat(1, Some(8)),
                ]),
            ),
            TokenPattern::labeled(
                "STRING",
                Regex::Seq(vec![
                    "\"".into(),
                    Regex::Alt(vec![
                        CharList::negated(['"', '\\', '\n']).into(),
                        Regex::Seq(vec!["\\".into(), Regex::none_of(['\n'])]),
                    ])
                    .star(),
                    "\"".into(),
                ]),
            ),
            TokenPattern::new("=="),
            TokenPattern::new("="),
            TokenPattern::new("+"),
            TokenPattern::new("("),
            TokenPattern::new(")"),
            TokenPattern::labeled(
                "IDENT",
                Regex::Seq(vec![
                    letter(),
                    Regex::Alt(vec![letter(), digit()]).star(),
                ]),
            ),
        ];

        let grammar = LexerGrammar::new(keywords.chain(builtin))
            .with_states([DEFAULT_STATE, "COMMENT"]);

        if ignore_case {
            grammar.ignore_case()
        } else {
            grammar
        }
    }

    fn print_table(data: &LexerData, state: &LexicalStateData) {
        let name = |t| data.token_name(t).unwrap_or("?");

        for comp in state.composites() {
            let ordinal = comp.ordinal().map_or("-", name);
            let members: Vec<_> = state
                .composite_states(comp)
                .map(|s| s.moves_array_name())
                .collect();
            println!("{} [{ordinal}]: {}", comp.method_name(state.name()), members.join(" "));
        }

        println!();

        for st in state.simple_states() {
            let next = match st.next() {
                NextState::Dead => "-".to_owned(),
                NextState::Simple(s) => state.simple_state(s).moves_array_name(),
                NextState::Composite(c) => state.composites()[c].method_name(state.name()),
            };
            let tok = st.next_type().map_or("-", name);

            println!(
                "{}: ascii={:?} other={:?} -> {next} [{tok}]",
                st.moves_array_name(),
                st.ascii_ranges(),
                st.non_ascii_ranges(),
            );
        }
    }

    fn run(
        Opts {
            verbose: _,
            ignore_case,
            state,
            dot,
            literals,
            input,
        }: Opts,
    ) -> Result<()> {
        let grammar = demo_grammar(literals, ignore_case);
        let data = LexerData::build(&grammar).context("Error compiling lexer grammar")?;

        let lsd = data
            .lexical_state(&state)
            .with_context(|| format!("No lexical state named {state:?}"))?;

        if dot {
            println!("{}", lsd.dot(|t| data.token_name(t).unwrap_or("?").into()));
        } else {
            print_table(&data, lsd);
        }

        if let Some(input) = input {
            println!();

            for lexeme in Scanner::new(&data, &input) {
                let lexeme = lexeme.context("Error scanning input")?;
                println!(
                    "{} {:?} ({})",
                    data.token_name(lexeme.token).unwrap_or("?"),
                    lexeme.text,
                    data.lexical_state_name(lexeme.lexical_state).unwrap_or("?"),
                );
            }
        }

        Ok(())
    }
}
