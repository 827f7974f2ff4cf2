//! Rendered expressions must reproduce the numeric drive when evaluated by an
//! independent implementation of the expression grammar.
use std::f64::consts::{PI, TAU};

use anyhow::{Context, Result, bail};
use pulse_sequence::{ConstPulse, PulseSequence, SequenceConfig, Time};
use test_case::test_case;

#[derive(Debug)]
enum Node {
    Num(f64),
    T,
    Pi,
    Neg(Box<Node>),
    Bin(char, Box<Node>, Box<Node>),
    Call(String, Vec<Node>),
}

impl Node {
    fn eval(&self, t: f64) -> Result<f64> {
        Ok(match self {
            Self::Num(v) => *v,
            Self::T => t,
            Self::Pi => PI,
            Self::Neg(a) => -a.eval(t)?,
            Self::Bin(op, a, b) => {
                let (a, b) = (a.eval(t)?, b.eval(t)?);
                match op {
                    '+' => a + b,
                    '-' => a - b,
                    '*' => a * b,
                    '/' => a / b,
                    _ => bail!("Unknown operator {op}"),
                }
            }
            Self::Call(name, args) => match (name.as_str(), args.as_slice()) {
                ("sin", [x]) => x.eval(t)?.sin(),
                ("heaviside", [x, x0]) => {
                    let x = x.eval(t)?;
                    if x < 0.0 {
                        0.0
                    } else if x > 0.0 {
                        1.0
                    } else {
                        x0.eval(t)?
                    }
                }
                _ => bail!("Unknown function {name}/{}", args.len()),
            },
        })
    }
}

struct Parser<'a> {
    src: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn parse(src: &'a str) -> Result<Node> {
        let mut p = Self {
            src: src.as_bytes(),
            pos: 0,
        };
        let node = p.expr()?;
        p.skip_ws();
        if p.pos != p.src.len() {
            bail!("Trailing input at {} in {src}", p.pos);
        }
        Ok(node)
    }

    fn skip_ws(&mut self) {
        while self.src.get(self.pos).is_some_and(u8::is_ascii_whitespace) {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Option<u8> {
        self.skip_ws();
        self.src.get(self.pos).copied()
    }

    fn expect(&mut self, c: u8) -> Result<()> {
        if self.peek() != Some(c) {
            bail!("Expected '{}' at {}", c as char, self.pos);
        }
        self.pos += 1;
        Ok(())
    }

    fn expr(&mut self) -> Result<Node> {
        let mut lhs = self.term()?;
        while let Some(op @ (b'+' | b'-')) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Node::Bin(op as char, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Node> {
        let mut lhs = self.factor()?;
        while let Some(op @ (b'*' | b'/')) = self.peek() {
            self.pos += 1;
            let rhs = self.factor()?;
            lhs = Node::Bin(op as char, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn factor(&mut self) -> Result<Node> {
        match self.peek() {
            Some(b'-') => {
                self.pos += 1;
                Ok(Node::Neg(Box::new(self.factor()?)))
            }
            Some(b'(') => {
                self.pos += 1;
                let inner = self.expr()?;
                self.expect(b')')?;
                Ok(inner)
            }
            Some(c) if c.is_ascii_digit() || c == b'.' => self.number(),
            Some(c) if c.is_ascii_alphabetic() => self.ident(),
            other => bail!("Unexpected {:?} at {}", other.map(char::from), self.pos),
        }
    }

    fn number(&mut self) -> Result<Node> {
        let start = self.pos;
        while let Some(&c) = self.src.get(self.pos) {
            let exponent_sign =
                (c == b'+' || c == b'-') && matches!(self.src.get(self.pos - 1), Some(b'e' | b'E'));
            if c.is_ascii_digit() || c == b'.' || c == b'e' || c == b'E' || exponent_sign {
                self.pos += 1;
            } else {
                break;
            }
        }
        let text = std::str::from_utf8(&self.src[start..self.pos])?;
        Ok(Node::Num(
            text.parse().with_context(|| format!("Bad number {text}"))?,
        ))
    }

    fn ident(&mut self) -> Result<Node> {
        let start = self.pos;
        while self
            .src
            .get(self.pos)
            .is_some_and(|c| c.is_ascii_alphanumeric() || *c == b'_')
        {
            self.pos += 1;
        }
        let name = std::str::from_utf8(&self.src[start..self.pos])?.to_owned();
        match name.as_str() {
            "t" => return Ok(Node::T),
            "pi" => return Ok(Node::Pi),
            _ => {}
        }
        self.expect(b'(')?;
        let mut args = vec![self.expr()?];
        while self.peek() == Some(b',') {
            self.pos += 1;
            args.push(self.expr()?);
        }
        self.expect(b')')?;
        Ok(Node::Call(name, args))
    }
}

fn grid(lo: f64, hi: f64, n: u32) -> impl Iterator<Item = f64> {
    (0..n).map(move |i| lo + (hi - lo) * f64::from(i) / f64::from(n - 1))
}

#[test_case(TAU * 5e9, 0.1, 20.0, 2.0, 0.0, 0.0; "ghz carrier")]
#[test_case(TAU * 0.3, 1.0, 10.0, 1.0, 0.4, 3.0; "offset start with phase")]
#[test_case(TAU * 0.05, -0.5, 10.0, 5.0, 0.0, -2.0; "ramps touch")]
#[test_case(TAU * 1.1, 0.25, 10.0, 7.5, -1.0, 0.0; "ramps overlap")]
#[test_case(TAU * 0.7, 2.0, 4.0, 0.0, 0.0, 1.0; "no ramp")]
#[test_case(TAU * 0.7, 2.0, 4.0, 4.0, 0.0, 1.0; "rise equals duration")]
fn box_pulse_expression_matches_drive(
    omega: f64,
    amp: f64,
    duration: f64,
    rise: f64,
    phase: f64,
    start: f64,
) -> Result<()> {
    let mut seq = PulseSequence::new();
    let pulse = ConstPulse::new(omega, amp, duration, ("0", "1"))?
        .with_rise_time(rise)?
        .with_phase(phase)?
        .with_start(start)?;
    let record = seq.const_pulse(pulse)?;
    let text = record.expression().context("Box pulse has an expression")?.to_string();
    let parsed = Parser::parse(&text)?;
    for t in grid(start - 1.0, start + duration + 1.0, 1000) {
        let expected = record.drive().eval(t);
        let actual = parsed.eval(t)?;
        assert!(
            (expected - actual).abs() <= 1e-9,
            "t = {t}: numeric {expected}, expression {actual}\n{text}"
        );
    }
    Ok(())
}

#[test]
fn channel_expression_matches_channel_drive() -> Result<()> {
    let config = SequenceConfig::builder()
        .channel_count(3)
        .start_time(Time::new(1.0)?)
        .build()?;
    let mut seq = PulseSequence::with_config(config);
    seq.const_pulse(ConstPulse::new(TAU * 0.5, 0.2, 8.0, ("0", "1"))?.with_channel(0))?;
    seq.const_pulse(
        ConstPulse::new(TAU * 0.8, 0.3, 6.0, ("1", "2"))?
            .with_channel(2)
            .with_rise_time(0.5)?,
    )?;
    seq.wait(2.0)?;
    seq.const_pulse(
        ConstPulse::new(TAU * 0.5, 0.2, 8.0, ("0", "1"))?
            .with_channel(0)
            .with_phase(PI / 2.0)?,
    )?;

    let exprs = seq.channel_expressions()?;
    assert_eq!(exprs.len(), 3);
    assert_eq!(exprs[1], "0");
    let end = seq.cursor().value();
    for (channel, text) in exprs.iter().enumerate() {
        assert!(text.starts_with('0'));
        let parsed = Parser::parse(text)?;
        for t in grid(0.0, end + 1.0, 1000) {
            let expected: f64 = seq.records_on(channel).map(|r| r.drive().eval(t)).sum();
            let actual = parsed.eval(t)?;
            assert!(
                (expected - actual).abs() <= 1e-9,
                "channel {channel}, t = {t}: numeric {expected}, expression {actual}"
            );
        }
    }
    Ok(())
}

#[test]
fn parser_reads_grammar() -> Result<()> {
    let node = Parser::parse("2*sin(pi*(t-1)/(2*0.5))-(-1.5)+heaviside(t-3,1)")?;
    let at = |t: f64| node.eval(t);
    assert!((at(1.5)? - (2.0 * (PI * 0.5).sin() + 1.5)).abs() < 1e-12);
    assert!((at(3.0)? - (2.0 * (PI * 2.0).sin() + 2.5)).abs() < 1e-12);
    assert!(Parser::parse("cos(t)")?.eval(0.0).is_err());
    assert!(Parser::parse("t)").is_err());
    Ok(())
}
