//! Translation of CSS selectors into XPath.
//!
//! Element lookups are issued to the driver as XPath so that the same selector can be
//! evaluated along different axes: `descendant-or-self::` for ordinary lookups and
//! `ancestor::` for [`CssNode::closest`](crate::CssNode::closest).
//!
//! ```
//! use csschain::css::{Translator, ANCESTOR};
//!
//! let t = Translator::new();
//! assert_eq!(
//!     t.css_to_xpath("ul > li#first").unwrap(),
//!     "descendant-or-self::ul/li[@id = 'first']"
//! );
//! assert_eq!(
//!     t.css_to_xpath_with_prefix("form", ANCESTOR).unwrap(),
//!     "ancestor::form"
//! );
//! ```

use std::error::Error;
use std::fmt;

/// Axis prefix used for ordinary lookups.
pub const DESCENDANT_OR_SELF: &str = "descendant-or-self::";

/// Axis prefix used to search the ancestors of an element.
pub const ANCESTOR: &str = "ancestor::";

/// A CSS selector that could not be translated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorError {
    /// The selector as given.
    pub selector: String,
    /// Why it was rejected.
    pub reason: String,
}

impl fmt::Display for SelectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Failed to convert locator: {} to xpath: {}",
            self.selector, self.reason
        )
    }
}

impl Error for SelectorError {}

/// Converts CSS selectors into XPath expressions.
///
/// Supported: type and universal selectors, `#id`, `.class`, attribute selectors
/// (`[a]`, `=`, `~=`, `|=`, `^=`, `$=`, `*=`), the descendant, `>`, `+` and `~` combinators,
/// selector groups, and the pseudo-classes `:first-child`, `:last-child`, `:only-child`,
/// `:first-of-type`, `:last-of-type`, `:nth-child()`, `:empty`, `:not()`, `:has()`,
/// `:contains()`, `:checked`, `:selected`, `:disabled`, `:enabled` and `:link`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Translator {
    _priv: (),
}

impl Translator {
    /// A new translator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Translate `css` using the [`DESCENDANT_OR_SELF`] axis.
    pub fn css_to_xpath(&self, css: &str) -> Result<String, SelectorError> {
        self.css_to_xpath_with_prefix(css, DESCENDANT_OR_SELF)
    }

    /// Translate `css`, starting every selector group with `prefix`.
    pub fn css_to_xpath_with_prefix(&self, css: &str, prefix: &str) -> Result<String, SelectorError> {
        let groups = parse_groups(css).map_err(|reason| SelectorError {
            selector: css.to_string(),
            reason,
        })?;
        let xpath = groups_to_xpath(&groups, prefix).map_err(|reason| SelectorError {
            selector: css.to_string(),
            reason,
        })?;
        Ok(xpath)
    }
}

/// XPath locating a form control by id, name, placeholder or label text, relative to the
/// current element.
pub fn field_xpath(locator: &str) -> String {
    let l = literal(locator);
    let control = "*[self::input or self::textarea or self::select]\
                   [not(@type = 'submit' or @type = 'image' or @type = 'hidden')]";
    format!(
        ".//{control}[@id = {l} or @name = {l} or @placeholder = {l} \
         or @id = //label[normalize-space(string(.)) = {l}]/@for] \
         | .//label[normalize-space(string(.)) = {l}]//{control}",
        control = control,
        l = l
    )
}

/// Quote `s` as an XPath string literal.
pub fn literal(s: &str) -> String {
    if !s.contains('\'') {
        format!("'{}'", s)
    } else if !s.contains('"') {
        format!("\"{}\"", s)
    } else {
        let parts: Vec<String> = s.split('\'').map(|p| format!("'{}'", p)).collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrCondition {
    Exists { key: String },
    Eq { key: String, value: String },
    Includes { key: String, value: String },
    DashMatch { key: String, value: String },
    StartsWith { key: String, value: String },
    EndsWith { key: String, value: String },
    Contains { key: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Pseudo {
    FirstChild,
    LastChild,
    OnlyChild,
    FirstOfType,
    LastOfType,
    Empty,
    Checked,
    Selected,
    Disabled,
    Enabled,
    Link,
    // an + b
    NthChild(i64, i64),
    Not(Vec<Step>),
    Has(Vec<Vec<Part>>),
    Contains(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Step {
    tag: Option<String>,
    universal: bool,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrCondition>,
    pseudos: Vec<Pseudo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
    AdjacentSibling,
    GeneralSibling,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Part {
    step: Step,
    // relation to the part on the left
    combinator: Option<Combinator>,
}

type Parse<T> = Result<T, String>;

fn parse_groups(selector: &str) -> Parse<Vec<Vec<Part>>> {
    split_top_level(selector, |ch| ch == ',', false)?
        .iter()
        .map(|group| parse_chain(group))
        .collect()
}

fn parse_chain(selector: &str) -> Parse<Vec<Part>> {
    let selector = selector.trim();
    if selector.is_empty() {
        return Err("empty selector".to_string());
    }

    let mut parts = Vec::new();
    let mut pending: Option<Combinator> = None;

    for token in tokenize(selector)? {
        let combinator = match token.as_str() {
            ">" => Some(Combinator::Child),
            "+" => Some(Combinator::AdjacentSibling),
            "~" => Some(Combinator::GeneralSibling),
            _ => None,
        };
        if let Some(c) = combinator {
            if pending.is_some() || parts.is_empty() {
                return Err(format!("unexpected combinator {:?}", token));
            }
            pending = Some(c);
            continue;
        }

        let step = parse_step(&token)?;
        let combinator = if parts.is_empty() {
            None
        } else {
            Some(pending.take().unwrap_or(Combinator::Descendant))
        };
        parts.push(Part { step, combinator });
    }

    if pending.is_some() {
        return Err("selector ends with a combinator".to_string());
    }
    Ok(parts)
}

/// Splits `selector` at characters accepted by `is_split` that sit outside of brackets,
/// parentheses and quotes. With `keep_split` the separators become tokens of their own.
fn split_top_level<F>(selector: &str, is_split: F, keep_split: bool) -> Parse<Vec<String>>
where
    F: Fn(char) -> bool,
{
    let mut out = Vec::new();
    let mut current = String::new();
    let mut brackets = 0usize;
    let mut parens = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for ch in selector.chars() {
        if let Some(q) = quote {
            current.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }

        match ch {
            '\'' | '"' => {
                quote = Some(ch);
                current.push(ch);
            }
            '[' => {
                brackets += 1;
                current.push(ch);
            }
            ']' => {
                brackets = brackets
                    .checked_sub(1)
                    .ok_or_else(|| "unbalanced ']'".to_string())?;
                current.push(ch);
            }
            '(' => {
                parens += 1;
                current.push(ch);
            }
            ')' => {
                parens = parens
                    .checked_sub(1)
                    .ok_or_else(|| "unbalanced ')'".to_string())?;
                current.push(ch);
            }
            ch if brackets == 0 && parens == 0 && is_split(ch) => {
                let trimmed = current.trim();
                if !keep_split && trimmed.is_empty() {
                    return Err("empty selector group".to_string());
                }
                if !trimmed.is_empty() {
                    out.push(trimmed.to_string());
                }
                current.clear();
                if keep_split && !ch.is_whitespace() {
                    out.push(ch.to_string());
                }
            }
            _ => current.push(ch),
        }
    }

    if quote.is_some() {
        return Err("unterminated string".to_string());
    }
    if brackets != 0 || parens != 0 {
        return Err("unbalanced brackets".to_string());
    }

    let trimmed = current.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    } else if !keep_split {
        return Err("empty selector group".to_string());
    }
    Ok(out)
}

fn tokenize(selector: &str) -> Parse<Vec<String>> {
    split_top_level(
        selector,
        |ch| ch.is_whitespace() || ch == '>' || ch == '+' || ch == '~',
        true,
    )
}

fn parse_step(part: &str) -> Parse<Step> {
    let bytes = part.as_bytes();
    let mut i = 0usize;
    let mut step = Step::default();

    while i < bytes.len() {
        match bytes[i] {
            b'*' => {
                if step.universal || step.tag.is_some() || i != 0 {
                    return Err(format!("misplaced '*' in {:?}", part));
                }
                step.universal = true;
                i += 1;
            }
            b'#' => {
                let (id, next) = parse_ident(part, i + 1)
                    .ok_or_else(|| format!("expected an id after '#' in {:?}", part))?;
                if step.id.replace(id).is_some() {
                    return Err(format!("more than one id in {:?}", part));
                }
                i = next;
            }
            b'.' => {
                let (class, next) = parse_ident(part, i + 1)
                    .ok_or_else(|| format!("expected a class name after '.' in {:?}", part))?;
                step.classes.push(class);
                i = next;
            }
            b'[' => {
                let (attr, next) = parse_attr(part, i)?;
                step.attrs.push(attr);
                i = next;
            }
            b':' => {
                let (pseudo, next) = parse_pseudo(part, i)?;
                step.pseudos.push(pseudo);
                i = next;
            }
            _ => {
                if i != 0 {
                    return Err(format!("unexpected character in {:?}", part));
                }
                let (tag, next) = parse_ident(part, i)
                    .ok_or_else(|| format!("unexpected character in {:?}", part))?;
                step.tag = Some(tag.to_ascii_lowercase());
                i = next;
            }
        }
    }

    Ok(step)
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-' || b >= 0x80
}

fn parse_ident(src: &str, start: usize) -> Option<(String, usize)> {
    let bytes = src.as_bytes();
    let mut end = start;
    while end < bytes.len() && is_ident_byte(bytes[end]) {
        end += 1;
    }
    if end == start {
        return None;
    }
    Some((src.get(start..end)?.to_string(), end))
}

fn parse_attr(src: &str, open: usize) -> Parse<(AttrCondition, usize)> {
    let close = find_closing(src, open + 1, b'[', b']')
        .ok_or_else(|| format!("unterminated attribute selector in {:?}", src))?;
    let body = src[open + 1..close].trim();

    let op_at = body.find(|c| matches!(c, '=' | '~' | '|' | '^' | '$' | '*'));
    let Some(op_at) = op_at else {
        let key = attr_name(body)?;
        return Ok((AttrCondition::Exists { key }, close + 1));
    };

    let key = attr_name(body[..op_at].trim())?;
    let rest = &body[op_at..];
    let (op, value) = if let Some(v) = rest.strip_prefix('=') {
        ("=", v)
    } else if rest.as_bytes().get(1) == Some(&b'=') {
        (&rest[..1], &rest[2..])
    } else {
        return Err(format!("unknown attribute operator in {:?}", src));
    };
    let value = attr_value(value.trim())?;

    let cond = match op {
        "=" => AttrCondition::Eq { key, value },
        "~" => AttrCondition::Includes { key, value },
        "|" => AttrCondition::DashMatch { key, value },
        "^" => AttrCondition::StartsWith { key, value },
        "$" => AttrCondition::EndsWith { key, value },
        "*" => AttrCondition::Contains { key, value },
        _ => return Err(format!("unknown attribute operator in {:?}", src)),
    };
    Ok((cond, close + 1))
}

fn attr_name(raw: &str) -> Parse<String> {
    let ok = !raw.is_empty()
        && raw
            .bytes()
            .all(|b| is_ident_byte(b) || b == b':');
    if ok {
        Ok(raw.to_ascii_lowercase())
    } else {
        Err(format!("invalid attribute name {:?}", raw))
    }
}

fn attr_value(raw: &str) -> Parse<String> {
    match raw.chars().next() {
        Some(q @ ('"' | '\'')) => {
            if raw.len() < 2 || !raw.ends_with(q) {
                return Err(format!("unterminated string {}", raw));
            }
            Ok(unescape(&raw[1..raw.len() - 1]))
        }
        _ => {
            if raw.chars().any(char::is_whitespace) {
                return Err(format!("unquoted attribute value {:?}", raw));
            }
            Ok(unescape(raw))
        }
    }
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(ch);
        }
    }
    out
}

/// Index of the byte closing the group opened just before `start`, skipping quoted text.
fn find_closing(src: &str, start: usize, open: u8, close: u8) -> Option<usize> {
    let bytes = src.as_bytes();
    let mut depth = 1usize;
    let mut quote: Option<u8> = None;
    let mut escaped = false;

    for (idx, &b) in bytes.iter().enumerate().skip(start) {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == q {
                quote = None;
            }
            continue;
        }
        match b {
            b'\'' | b'"' => quote = Some(b),
            b if b == open => depth += 1,
            b if b == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_pseudo(src: &str, colon: usize) -> Parse<(Pseudo, usize)> {
    if src.as_bytes().get(colon + 1) == Some(&b':') {
        return Err(format!("pseudo-elements are not supported: {:?}", src));
    }
    let (name, next) = parse_ident(src, colon + 1)
        .ok_or_else(|| format!("expected a pseudo-class after ':' in {:?}", src))?;
    let name = name.to_ascii_lowercase();

    if src.as_bytes().get(next) != Some(&b'(') {
        let pseudo = match name.as_str() {
            "first-child" => Pseudo::FirstChild,
            "last-child" => Pseudo::LastChild,
            "only-child" => Pseudo::OnlyChild,
            "first-of-type" => Pseudo::FirstOfType,
            "last-of-type" => Pseudo::LastOfType,
            "empty" => Pseudo::Empty,
            "checked" => Pseudo::Checked,
            "selected" => Pseudo::Selected,
            "disabled" => Pseudo::Disabled,
            "enabled" => Pseudo::Enabled,
            "link" => Pseudo::Link,
            _ => return Err(format!("unsupported pseudo-class :{}", name)),
        };
        return Ok((pseudo, next));
    }

    let close = find_closing(src, next + 1, b'(', b')')
        .ok_or_else(|| format!("unterminated :{}() in {:?}", name, src))?;
    let arg = src[next + 1..close].trim();

    let pseudo = match name.as_str() {
        "nth-child" => {
            let (a, b) = parse_nth(arg).ok_or_else(|| format!("invalid :nth-child({})", arg))?;
            Pseudo::NthChild(a, b)
        }
        "not" => {
            let mut steps = Vec::new();
            for group in parse_groups(arg)? {
                match <[Part; 1]>::try_from(group) {
                    Ok([part]) => steps.push(part.step),
                    Err(_) => return Err(format!(":not() only accepts simple selectors: {:?}", arg)),
                }
            }
            Pseudo::Not(steps)
        }
        "has" => Pseudo::Has(parse_groups(arg)?),
        "contains" => Pseudo::Contains(attr_value(arg)?),
        _ => return Err(format!("unsupported pseudo-class :{}()", name)),
    };
    Ok((pseudo, close + 1))
}

fn parse_nth(raw: &str) -> Option<(i64, i64)> {
    let expr: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();

    match expr.as_str() {
        "odd" => return Some((2, 1)),
        "even" => return Some((2, 0)),
        _ => {}
    }

    let Some(n_at) = expr.find('n') else {
        return expr.parse::<i64>().ok().map(|b| (0, b));
    };
    let a = match &expr[..n_at] {
        "" | "+" => 1,
        "-" => -1,
        a => a.parse::<i64>().ok()?,
    };
    // a negative step is negated when building the xpath
    a.checked_neg()?;
    let b = match &expr[n_at + 1..] {
        "" => 0,
        b if b.starts_with('+') || b.starts_with('-') => b.parse::<i64>().ok()?,
        _ => return None,
    };
    Some((a, b))
}

fn groups_to_xpath(groups: &[Vec<Part>], prefix: &str) -> Parse<String> {
    let mut paths = Vec::with_capacity(groups.len());
    for group in groups {
        paths.push(chain_to_xpath(group, prefix)?);
    }
    Ok(paths.join(" | "))
}

fn chain_to_xpath(parts: &[Part], prefix: &str) -> Parse<String> {
    let mut xpath = String::from(prefix);

    for part in parts {
        let mut conditions = Vec::new();
        match part.combinator {
            None | Some(Combinator::Descendant) | Some(Combinator::Child) => {
                if part.combinator == Some(Combinator::Descendant) {
                    xpath.push_str("/descendant-or-self::*/");
                } else if part.combinator == Some(Combinator::Child) {
                    xpath.push('/');
                }
                xpath.push_str(part.step.tag.as_deref().unwrap_or("*"));
            }
            Some(Combinator::GeneralSibling) => {
                xpath.push_str("/following-sibling::");
                xpath.push_str(part.step.tag.as_deref().unwrap_or("*"));
            }
            Some(Combinator::AdjacentSibling) => {
                xpath.push_str("/following-sibling::*[1]");
                if let Some(tag) = &part.step.tag {
                    conditions.push(format!("name() = {}", literal(tag)));
                }
            }
        }

        conditions.extend(step_conditions(&part.step)?);
        for cond in conditions {
            xpath.push('[');
            xpath.push_str(&cond);
            xpath.push(']');
        }
    }

    Ok(xpath)
}

/// The predicates of a step, not including its element name.
fn step_conditions(step: &Step) -> Parse<Vec<String>> {
    let mut conds = Vec::new();

    if let Some(id) = &step.id {
        conds.push(format!("@id = {}", literal(id)));
    }
    for class in &step.classes {
        conds.push(includes("class", class));
    }
    for attr in &step.attrs {
        conds.push(attr_condition(attr));
    }
    for pseudo in &step.pseudos {
        conds.push(pseudo_condition(step, pseudo)?);
    }

    Ok(conds)
}

fn includes(key: &str, value: &str) -> String {
    format!(
        "@{key} and contains(concat(' ', normalize-space(@{key}), ' '), {})",
        literal(&format!(" {} ", value)),
        key = key
    )
}

fn attr_condition(attr: &AttrCondition) -> String {
    match attr {
        AttrCondition::Exists { key } => format!("@{}", key),
        AttrCondition::Eq { key, value } => format!("@{} = {}", key, literal(value)),
        AttrCondition::Includes { key, value } => includes(key, value),
        AttrCondition::DashMatch { key, value } => format!(
            "@{key} and (@{key} = {} or starts-with(@{key}, {}))",
            literal(value),
            literal(&format!("{}-", value)),
            key = key
        ),
        AttrCondition::StartsWith { value, .. }
        | AttrCondition::EndsWith { value, .. }
        | AttrCondition::Contains { value, .. }
            if value.is_empty() =>
        {
            "false()".to_string()
        }
        AttrCondition::StartsWith { key, value } => format!(
            "@{key} and starts-with(@{key}, {})",
            literal(value),
            key = key
        ),
        AttrCondition::EndsWith { key, value } => format!(
            "@{key} and substring(@{key}, string-length(@{key}) - {}) = {}",
            value.chars().count() - 1,
            literal(value),
            key = key
        ),
        AttrCondition::Contains { key, value } => format!(
            "@{key} and contains(@{key}, {})",
            literal(value),
            key = key
        ),
    }
}

const FORM_CONTROLS: &str =
    "name(.) = 'button' or name(.) = 'input' or name(.) = 'select' or name(.) = 'textarea' or name(.) = 'option'";

fn pseudo_condition(step: &Step, pseudo: &Pseudo) -> Parse<String> {
    let cond = match pseudo {
        Pseudo::FirstChild => "count(preceding-sibling::*) = 0".to_string(),
        Pseudo::LastChild => "count(following-sibling::*) = 0".to_string(),
        Pseudo::OnlyChild => {
            "count(preceding-sibling::*) = 0 and count(following-sibling::*) = 0".to_string()
        }
        Pseudo::FirstOfType | Pseudo::LastOfType => {
            let tag = step
                .tag
                .as_deref()
                .ok_or_else(|| "*:first-of-type and *:last-of-type are not supported".to_string())?;
            let axis = if *pseudo == Pseudo::FirstOfType {
                "preceding-sibling"
            } else {
                "following-sibling"
            };
            format!("count({}::{}) = 0", axis, tag)
        }
        Pseudo::Empty => "not(*) and not(string-length())".to_string(),
        Pseudo::Checked => "(@selected and name(.) = 'option') or (@checked and \
                            (name(.) = 'input' or name(.) = 'command') and \
                            (@type = 'checkbox' or @type = 'radio'))"
            .to_string(),
        Pseudo::Selected => "@selected and name(.) = 'option'".to_string(),
        Pseudo::Disabled => format!("@disabled and ({})", FORM_CONTROLS),
        Pseudo::Enabled => format!("not(@disabled) and ({})", FORM_CONTROLS),
        Pseudo::Link => {
            "@href and (name(.) = 'a' or name(.) = 'link' or name(.) = 'area')".to_string()
        }
        Pseudo::NthChild(a, b) => nth_child(*a, *b),
        Pseudo::Not(steps) => {
            let mut alternatives = Vec::with_capacity(steps.len());
            for inner in steps {
                let mut conds = Vec::new();
                if let Some(tag) = &inner.tag {
                    conds.push(format!("name() = {}", literal(tag)));
                }
                conds.extend(step_conditions(inner)?.into_iter().map(|c| format!("({})", c)));
                if conds.is_empty() {
                    conds.push("true()".to_string());
                }
                alternatives.push(conds.join(" and "));
            }
            format!("not({})", alternatives.join(" or "))
        }
        Pseudo::Has(groups) => groups_to_xpath(groups, "descendant::")?,
        Pseudo::Contains(text) => format!("contains(string(.), {})", literal(text)),
    };
    Ok(cond)
}

fn nth_child(a: i64, b: i64) -> String {
    const POSITION: &str = "(count(preceding-sibling::*) + 1)";
    match a {
        0 if b < 1 => "false()".to_string(),
        0 => format!("count(preceding-sibling::*) = {}", b - 1),
        a if a > 0 => {
            let step = if a == 1 {
                "true()".to_string()
            } else {
                format!("({} - {}) mod {} = 0", POSITION, b, a)
            };
            if b > 1 {
                format!("{} >= {} and {}", POSITION, b, step)
            } else {
                step
            }
        }
        a => format!("{} <= {} and ({} - {}) mod {} = 0", POSITION, b, b, POSITION, -a),
    }
}
