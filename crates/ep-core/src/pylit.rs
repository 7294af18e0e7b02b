//! Reader for Python-style data literals.
//!
//! Accepts lists, tuples, dicts, strings, ints, floats, `True`/`False`/`None`
//! and `+` concatenation of lists. Anything else (names, calls,
//! comprehensions) is a malformed literal.

use serde_json::{Map, Number, Value};

use crate::error::{EditError, EditResult};

pub fn parse(text: &str) -> EditResult<Value> {
    let mut parser = Parser { text, pos: 0 };
    let value = parser.concat()?;
    parser.skip_trivia();
    if parser.pos != text.len() {
        return Err(parser.malformed());
    }
    Ok(value)
}

struct Parser<'a> {
    text: &'a str,
    pos: usize,
}

impl Parser<'_> {
    fn malformed(&self) -> EditError {
        let tail: String = self.text[self.pos..].chars().take(24).collect();
        EditError::malformed("python", tail)
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() || c == '\\' => {
                    self.bump();
                }
                Some('#') => {
                    while let Some(c) = self.bump() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                _ => return,
            }
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        self.skip_trivia();
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn concat(&mut self) -> EditResult<Value> {
        let mut value = self.value()?;
        while self.eat('+') {
            let rhs = self.value()?;
            match (&mut value, rhs) {
                (Value::Array(lhs), Value::Array(rhs)) => lhs.extend(rhs),
                _ => return Err(self.malformed()),
            }
        }
        Ok(value)
    }

    fn value(&mut self) -> EditResult<Value> {
        self.skip_trivia();
        match self.peek() {
            Some('[') => self.sequence(']'),
            Some('(') => self.sequence(')'),
            Some('{') => self.dict(),
            Some('"' | '\'') => self.string().map(Value::String),
            Some(c) if c == '-' || c == '+' || c == '.' || c.is_ascii_digit() => self.number(),
            Some(c) if c.is_alphabetic() => self.keyword(),
            _ => Err(self.malformed()),
        }
    }

    fn sequence(&mut self, close: char) -> EditResult<Value> {
        self.bump();
        let mut items = Vec::new();
        loop {
            if self.eat(close) {
                return Ok(Value::Array(items));
            }
            items.push(self.concat()?);
            if !self.eat(',') {
                if self.eat(close) {
                    return Ok(Value::Array(items));
                }
                return Err(self.malformed());
            }
        }
    }

    fn dict(&mut self) -> EditResult<Value> {
        self.bump();
        let mut map = Map::new();
        loop {
            if self.eat('}') {
                return Ok(Value::Object(map));
            }
            let key = match self.value()? {
                Value::String(s) => s,
                other => other.to_string(),
            };
            if !self.eat(':') {
                return Err(self.malformed());
            }
            let value = self.concat()?;
            map.insert(key, value);
            if !self.eat(',') {
                if self.eat('}') {
                    return Ok(Value::Object(map));
                }
                return Err(self.malformed());
            }
        }
    }

    fn string(&mut self) -> EditResult<String> {
        let Some(quote) = self.bump() else {
            return Err(self.malformed());
        };
        let triple = self.text[self.pos..].starts_with(&format!("{quote}{quote}"));
        if triple {
            self.pos += 2 * quote.len_utf8();
        }
        let mut out = String::new();
        loop {
            let c = self.bump().ok_or_else(|| self.malformed())?;
            match c {
                '\\' => match self.bump().ok_or_else(|| self.malformed())? {
                    'n' => out.push('\n'),
                    't' => out.push('\t'),
                    'r' => out.push('\r'),
                    '\n' => {}
                    other => out.push(other),
                },
                c if c == quote => {
                    if !triple {
                        return Ok(out);
                    }
                    let closing = format!("{quote}{quote}");
                    if self.text[self.pos..].starts_with(&closing) {
                        self.pos += closing.len();
                        return Ok(out);
                    }
                    out.push(c);
                }
                '\n' if !triple => return Err(self.malformed()),
                c => out.push(c),
            }
        }
    }

    fn number(&mut self) -> EditResult<Value> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '+' | '_') {
                // A sign only continues a number right after an exponent marker.
                if matches!(c, '-' | '+')
                    && self.pos > start
                    && !self.text[..self.pos].ends_with(['e', 'E'])
                {
                    break;
                }
                self.bump();
            } else {
                break;
            }
        }
        let raw = self.text[start..self.pos].replace('_', "");
        if let Ok(int) = raw.parse::<i64>() {
            return Ok(Value::Number(int.into()));
        }
        raw.parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| EditError::malformed("python number", raw))
    }

    fn keyword(&mut self) -> EditResult<Value> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            self.bump();
        }
        match &self.text[start..self.pos] {
            "True" => Ok(Value::Bool(true)),
            "False" => Ok(Value::Bool(false)),
            "None" => Ok(Value::Null),
            _ => {
                self.pos = start;
                Err(self.malformed())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_records_and_concatenation() {
        let text = "[\n    {'inChannels': 3, \"padding\": 0},  # first\n] + [{'kernelSize': -5, 'w': 1.5e-1, 'on': True, 'x': None}]";
        let value = parse(text).unwrap();
        assert_eq!(
            value,
            json!([
                {"inChannels": 3, "padding": 0},
                {"kernelSize": -5, "w": 0.15, "on": true, "x": null}
            ])
        );
    }

    #[test]
    fn tuples_become_arrays() {
        assert_eq!(parse("(1, 2,)").unwrap(), json!([1, 2]));
    }

    #[test]
    fn comprehensions_are_rejected() {
        let text = "[{'a': 1} for _ in range(3)]";
        assert!(matches!(
            parse(text),
            Err(EditError::MalformedLiteral { .. })
        ));
    }

    #[test]
    fn trailing_garbage_is_rejected() {
        assert!(parse("[1] x").is_err());
    }
}
