//! Walks an AST and emits surface text. Structural emission for every node
//! kind mirrors the parser's grammar exactly (printer is the parser's
//! inverse); only whitespace, quote choice, and line-break placement are
//! stylistic and therefore configurable.

use crate::ast::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteStyle {
    Single,
    Double,
    /// Pick whichever quote avoids escaping, preferring single.
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemicolonStyle {
    Omit,
    Insert,
    /// Printer never reintroduces semicolons it did not itself emit; this
    /// style name exists for option-surface completeness but behaves like
    /// `Omit` since the AST does not retain "had a semicolon" trivia.
    Preserve,
}

#[derive(Debug, Clone)]
pub struct PrinterOptions {
    pub indent: String,
    /// Advisory only; the printer does not currently wrap long lines.
    pub max_line_length: usize,
    pub quote_style: QuoteStyle,
    pub semicolons: SemicolonStyle,
    pub insert_final_newline: bool,
}

impl Default for PrinterOptions {
    fn default() -> Self {
        Self {
            indent: "  ".to_string(),
            max_line_length: 80,
            quote_style: QuoteStyle::Auto,
            semicolons: SemicolonStyle::Omit,
            insert_final_newline: false,
        }
    }
}

const RESERVED_WORDS: &[&str] = &[
    "if", "then", "else", "elseif", "end", "while", "do", "for", "in", "repeat", "until",
    "function", "local", "return", "break", "goto", "and", "or", "not", "true", "false", "nil",
];

fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_') && !RESERVED_WORDS.contains(&name)
}

pub struct Printer {
    options: PrinterOptions,
    out: String,
    indent_level: usize,
}

impl Printer {
    pub fn new(options: PrinterOptions) -> Self {
        Self {
            options,
            out: String::new(),
            indent_level: 0,
        }
    }

    pub fn print_program(mut self, program: &Program) -> String {
        self.print_block(&program.body);
        if self.options.insert_final_newline && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
        self.out
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent_level {
            self.out.push_str(&self.options.indent);
        }
    }

    fn print_block(&mut self, body: &[Statement]) {
        for stmt in body {
            self.write_indent();
            self.print_statement(stmt);
            self.out.push('\n');
        }
    }

    fn maybe_semicolon(&mut self) {
        if matches!(self.options.semicolons, SemicolonStyle::Insert) {
            self.out.push(';');
        }
    }

    fn print_statement(&mut self, stmt: &Statement) {
        match stmt {
            Statement::Expression(s) => {
                self.print_expression(&s.expression, 0);
                self.maybe_semicolon();
            }
            Statement::Local(s) => {
                self.out.push_str("local ");
                self.print_identifier_list(&s.variables);
                if !s.init.is_empty() {
                    self.out.push_str(" = ");
                    self.print_expression_list(&s.init);
                }
                self.maybe_semicolon();
            }
            Statement::Assignment(s) => {
                self.print_expression_list(&s.targets);
                self.out.push_str(" = ");
                self.print_expression_list(&s.init);
                self.maybe_semicolon();
            }
            Statement::FunctionDeclaration(s) => self.print_function_declaration(s),
            Statement::If(s) => self.print_if(s),
            Statement::While(s) => {
                self.out.push_str("while ");
                self.print_expression(&s.condition, 0);
                self.out.push_str(" do\n");
                self.indent_level += 1;
                self.print_block(&s.body);
                self.indent_level -= 1;
                self.write_indent();
                self.out.push_str("end");
            }
            Statement::Repeat(s) => {
                self.out.push_str("repeat\n");
                self.indent_level += 1;
                self.print_block(&s.body);
                self.indent_level -= 1;
                self.write_indent();
                self.out.push_str("until ");
                self.print_expression(&s.condition, 0);
            }
            Statement::ForNumeric(s) => {
                self.out.push_str("for ");
                self.out.push_str(&s.variable.name);
                self.out.push_str(" = ");
                self.print_expression(&s.start, 0);
                self.out.push_str(", ");
                self.print_expression(&s.end, 0);
                if let Some(step) = &s.step {
                    self.out.push_str(", ");
                    self.print_expression(step, 0);
                }
                self.out.push_str(" do\n");
                self.indent_level += 1;
                self.print_block(&s.body);
                self.indent_level -= 1;
                self.write_indent();
                self.out.push_str("end");
            }
            Statement::ForGeneric(s) => {
                self.out.push_str("for ");
                self.print_identifier_list(&s.variables);
                self.out.push_str(" in ");
                self.print_expression_list(&s.iterators);
                self.out.push_str(" do\n");
                self.indent_level += 1;
                self.print_block(&s.body);
                self.indent_level -= 1;
                self.write_indent();
                self.out.push_str("end");
            }
            Statement::Return(s) => {
                self.out.push_str("return");
                if !s.arguments.is_empty() {
                    self.out.push(' ');
                    self.print_expression_list(&s.arguments);
                }
                self.maybe_semicolon();
            }
            Statement::Break(_) => {
                self.out.push_str("break");
                self.maybe_semicolon();
            }
            Statement::Do(s) => {
                self.out.push_str("do\n");
                self.indent_level += 1;
                self.print_block(&s.body);
                self.indent_level -= 1;
                self.write_indent();
                self.out.push_str("end");
            }
            Statement::Goto(s) => {
                self.out.push_str("goto ");
                self.out.push_str(&s.label);
            }
            Statement::Label(s) => {
                self.out.push_str("::");
                self.out.push_str(&s.name);
                self.out.push_str("::");
            }
            Statement::Empty(_) => {
                self.out.push(';');
            }
        }
    }

    fn print_function_declaration(&mut self, s: &FunctionDeclarationStmt) {
        if s.is_local {
            self.out.push_str("local ");
        }
        self.out.push_str("function ");
        self.print_expression(&s.name, 0);
        self.out.push('(');
        self.print_params(&s.params, s.is_vararg);
        self.out.push_str(")\n");
        self.indent_level += 1;
        self.print_block(&s.body);
        self.indent_level -= 1;
        self.write_indent();
        self.out.push_str("end");
    }

    fn print_params(&mut self, params: &[Identifier], is_vararg: bool) {
        let mut first = true;
        for p in params {
            if !first {
                self.out.push_str(", ");
            }
            first = false;
            self.out.push_str(&p.name);
        }
        if is_vararg {
            if !first {
                self.out.push_str(", ");
            }
            self.out.push_str("...");
        }
    }

    fn print_if(&mut self, s: &IfStmt) {
        for (i, clause) in s.clauses.iter().enumerate() {
            self.write_indent_if(i > 0);
            if i == 0 {
                self.out.push_str("if ");
            } else {
                self.out.push_str("elseif ");
            }
            self.print_expression(&clause.condition, 0);
            self.out.push_str(" then\n");
            self.indent_level += 1;
            self.print_block(&clause.body);
            self.indent_level -= 1;
        }
        if let Some(else_body) = &s.else_body {
            self.write_indent();
            self.out.push_str("else\n");
            self.indent_level += 1;
            self.print_block(else_body);
            self.indent_level -= 1;
        }
        self.write_indent();
        self.out.push_str("end");
    }

    /// `elseif`/`else` clauses after the first are written at the current
    /// indent level, since `print_if` is itself always invoked right after
    /// the caller's own `write_indent()` for the leading `if`.
    fn write_indent_if(&mut self, needed: bool) {
        if needed {
            self.write_indent();
        }
    }

    fn print_identifier_list(&mut self, idents: &[Identifier]) {
        for (i, id) in idents.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.out.push_str(&id.name);
        }
    }

    fn print_expression_list(&mut self, exprs: &[Expression]) {
        for (i, e) in exprs.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.print_expression(e, 0);
        }
    }

    /// `parent_prec` is 0 for a context with no enclosing operator (e.g. a
    /// statement's top-level expression); a child is parenthesized when its
    /// own precedence is lower than what the parent requires.
    fn print_expression(&mut self, expr: &Expression, parent_prec: u8) {
        match expr {
            Expression::Literal(lit) => self.print_literal(lit),
            Expression::Identifier(id) => self.out.push_str(&id.name),
            Expression::Vararg(_) => self.out.push_str("..."),
            Expression::Binary {
                operator,
                left,
                right,
                ..
            } => self.print_binary(*operator, left, right, parent_prec),
            Expression::Unary {
                operator, argument, ..
            } => self.print_unary(*operator, argument),
            Expression::Function {
                params,
                is_vararg,
                body,
                ..
            } => {
                self.out.push_str("function(");
                self.print_params(params, *is_vararg);
                self.out.push_str(")\n");
                self.indent_level += 1;
                self.print_block(body);
                self.indent_level -= 1;
                self.write_indent();
                self.out.push_str("end");
            }
            Expression::Call {
                callee,
                arguments,
                is_method,
                ..
            } => self.print_call(callee, arguments, *is_method),
            Expression::Member {
                base,
                name,
                computed_key,
                computed,
                ..
            } => self.print_member(base, name, computed_key.as_deref(), *computed),
            Expression::TableConstructor { fields, .. } => self.print_table(fields),
            Expression::Paren { inner, .. } => {
                self.out.push('(');
                self.print_expression(inner, 0);
                self.out.push(')');
            }
        }
    }

    fn print_literal(&mut self, lit: &Literal) {
        match &lit.value {
            LiteralValue::Nil => self.out.push_str("nil"),
            LiteralValue::Bool(b) => self.out.push_str(if *b { "true" } else { "false" }),
            LiteralValue::Integer(i) => self.out.push_str(&i.to_string()),
            LiteralValue::Float(f) => self.out.push_str(&format_float(*f)),
            LiteralValue::Str(s) => self.print_string_literal(s),
        }
    }

    fn print_string_literal(&mut self, s: &str) {
        if s.contains('\n') || s.contains('\r') {
            self.print_long_bracket_string(s);
            return;
        }
        let has_single = s.contains('\'');
        let has_double = s.contains('"');
        let quote = match self.options.quote_style {
            QuoteStyle::Single => '\'',
            QuoteStyle::Double => '"',
            QuoteStyle::Auto => {
                if has_single && !has_double {
                    '"'
                } else {
                    '\''
                }
            }
        };
        self.out.push(quote);
        for ch in s.chars() {
            match ch {
                '\\' => self.out.push_str("\\\\"),
                '\t' => self.out.push_str("\\t"),
                c if c == quote => {
                    self.out.push('\\');
                    self.out.push(c);
                }
                c => self.out.push(c),
            }
        }
        self.out.push(quote);
    }

    /// Chooses the minimum `=`-level long bracket whose closer does not
    /// already appear in the body.
    fn print_long_bracket_string(&mut self, s: &str) {
        let mut level = 0;
        loop {
            let closer = format!("]{}]", "=".repeat(level));
            if !s.contains(&closer) {
                break;
            }
            level += 1;
        }
        self.out.push('[');
        self.out.push_str(&"=".repeat(level));
        self.out.push('[');
        self.out.push_str(s);
        self.out.push(']');
        self.out.push_str(&"=".repeat(level));
        self.out.push(']');
    }

    fn print_binary(
        &mut self,
        op: BinaryOp,
        left: &Expression,
        right: &Expression,
        parent_prec: u8,
    ) {
        let prec = binary_print_precedence(op);
        let needs_parens = prec < parent_prec;
        if needs_parens {
            self.out.push('(');
        }
        // Left operand: for left-associative operators the left child at
        // equal precedence never needs parens; for the right-associative
        // operators (`..`, `^`) the left child does if it sits at the same
        // level, since it is now on the non-associative side.
        let left_min = if is_binary_right_assoc(op) { prec + 1 } else { prec };
        self.print_expression(left, left_min);
        self.out.push(' ');
        self.out.push_str(op.symbol());
        self.out.push(' ');
        let right_min = if is_binary_right_assoc(op) { prec } else { prec + 1 };
        self.print_expression(right, right_min);
        if needs_parens {
            self.out.push(')');
        }
    }

    fn print_unary(&mut self, op: UnaryOp, argument: &Expression) {
        self.out.push_str(op.symbol());
        match op {
            UnaryOp::Not => self.out.push(' '),
            // `--x` would be re-lexed as a comment opener; separate a nested
            // unary minus with a space. `#` never needs a space.
            UnaryOp::Neg if matches!(argument, Expression::Unary { operator: UnaryOp::Neg, .. }) => {
                self.out.push(' ')
            }
            UnaryOp::Neg | UnaryOp::Len => {}
        }
        self.print_expression(argument, UNARY_PRINT_PRECEDENCE);
    }

    fn print_call(&mut self, callee: &Expression, arguments: &[Expression], is_method: bool) {
        if is_method {
            if let Expression::Member { base, name, .. } = callee {
                self.print_expression(base, CALL_PRINT_PRECEDENCE);
                self.out.push(':');
                self.out.push_str(name);
                self.out.push('(');
                self.print_expression_list(&arguments[1..]);
                self.out.push(')');
                return;
            }
        }
        self.print_expression(callee, CALL_PRINT_PRECEDENCE);
        self.out.push('(');
        self.print_expression_list(arguments);
        self.out.push(')');
    }

    fn print_member(
        &mut self,
        base: &Expression,
        name: &str,
        computed_key: Option<&Expression>,
        computed: bool,
    ) {
        self.print_expression(base, CALL_PRINT_PRECEDENCE);
        if computed {
            self.out.push('[');
            if let Some(key) = computed_key {
                self.print_expression(key, 0);
            }
            self.out.push(']');
        } else if is_valid_identifier(name) {
            self.out.push('.');
            self.out.push_str(name);
        } else {
            self.out.push_str("[\"");
            self.out.push_str(&name.replace('"', "\\\""));
            self.out.push_str("\"]");
        }
    }

    fn print_table(&mut self, fields: &[TableField]) {
        if fields.is_empty() {
            self.out.push_str("{}");
            return;
        }
        self.out.push_str("{\n");
        self.indent_level += 1;
        for field in fields {
            self.write_indent();
            match field {
                TableField::Array(value) => self.print_expression(value, 0),
                TableField::Named(key, value) => {
                    if is_valid_identifier(&key.name) {
                        self.out.push_str(&key.name);
                    } else {
                        self.out.push_str("[\"");
                        self.out.push_str(&key.name.replace('"', "\\\""));
                        self.out.push_str("\"]");
                    }
                    self.out.push_str(" = ");
                    self.print_expression(value, 0);
                }
                TableField::Computed(key, value) => {
                    self.out.push('[');
                    self.print_expression(key, 0);
                    self.out.push_str("] = ");
                    self.print_expression(value, 0);
                }
            }
            self.out.push_str(",\n");
        }
        self.indent_level -= 1;
        self.write_indent();
        self.out.push('}');
    }
}

const UNARY_PRINT_PRECEDENCE: u8 = 7;
const CALL_PRINT_PRECEDENCE: u8 = 9;

fn binary_print_precedence(op: BinaryOp) -> u8 {
    match op {
        BinaryOp::Or => 1,
        BinaryOp::And => 2,
        BinaryOp::Lt | BinaryOp::Gt | BinaryOp::LtEq | BinaryOp::GtEq | BinaryOp::Eq | BinaryOp::NotEq => 3,
        BinaryOp::Concat => 4,
        BinaryOp::Add | BinaryOp::Sub => 5,
        BinaryOp::Mul | BinaryOp::Div | BinaryOp::FloorDiv | BinaryOp::Mod => 6,
        BinaryOp::Pow => 8,
    }
}

fn is_binary_right_assoc(op: BinaryOp) -> bool {
    matches!(op, BinaryOp::Concat | BinaryOp::Pow)
}

/// Canonical decimal rendering for a float: integral-valued floats still
/// print with a trailing `.0` so the printer never collapses a genuine float
/// literal into something the parser would re-read as an integer.
fn format_float(f: f64) -> String {
    if f.is_nan() {
        return "nan".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if f == f.trunc() && f.abs() < 1e15 {
        format!("{:.1}", f)
    } else {
        let mut s = format!("{}", f);
        if !s.contains('.') && !s.contains('e') {
            s.push_str(".0");
        }
        s
    }
}

pub fn print(program: &Program, options: PrinterOptions) -> String {
    Printer::new(options).print_program(program)
}
