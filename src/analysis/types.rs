//! Checker types and their textual form.

use std::fmt;

use super::binder::SymbolId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intrinsic {
    Any,
    Unknown,
    Never,
    Void,
    Undefined,
    Null,
    Number,
    String,
    Boolean,
    BigInt,
    Symbol,
    Object,
}

impl Intrinsic {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Some(match keyword {
            "any" => Intrinsic::Any,
            "unknown" => Intrinsic::Unknown,
            "never" => Intrinsic::Never,
            "void" => Intrinsic::Void,
            "undefined" => Intrinsic::Undefined,
            "null" => Intrinsic::Null,
            "number" => Intrinsic::Number,
            "string" => Intrinsic::String,
            "boolean" => Intrinsic::Boolean,
            "bigint" => Intrinsic::BigInt,
            "symbol" => Intrinsic::Symbol,
            "object" => Intrinsic::Object,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Intrinsic::Any => "any",
            Intrinsic::Unknown => "unknown",
            Intrinsic::Never => "never",
            Intrinsic::Void => "void",
            Intrinsic::Undefined => "undefined",
            Intrinsic::Null => "null",
            Intrinsic::Number => "number",
            Intrinsic::String => "string",
            Intrinsic::Boolean => "boolean",
            Intrinsic::BigInt => "bigint",
            Intrinsic::Symbol => "symbol",
            Intrinsic::Object => "object",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Intrinsic(Intrinsic),
    /// Literal type in display form.
    Literal(String),
    Reference {
        /// The name as written at the use site.
        name: String,
        symbol: Option<SymbolId>,
        args: Vec<Type>,
    },
    Array {
        element: Box<Type>,
        readonly: bool,
    },
    Tuple(Vec<TupleElement>),
    Union(Vec<Type>),
    Intersection(Vec<Type>),
    Function(Box<FunctionType>),
    Object(Vec<ObjectMember>),
    This,
    Raw(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TupleElement {
    pub ty: Type,
    pub optional: bool,
    pub rest: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionType {
    pub params: Vec<FunctionTypeParam>,
    pub return_type: Type,
    pub is_constructor: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionTypeParam {
    pub name: String,
    pub optional: bool,
    pub rest: bool,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectMember {
    Property {
        name: String,
        optional: bool,
        readonly: bool,
        ty: Type,
    },
    Method {
        name: String,
        optional: bool,
        params: Vec<FunctionTypeParam>,
        return_type: Type,
    },
    Raw(String),
}

impl Type {
    pub const ANY: Type = Type::Intrinsic(Intrinsic::Any);
    pub const VOID: Type = Type::Intrinsic(Intrinsic::Void);

    pub fn is_any(&self) -> bool {
        matches!(self, Type::Intrinsic(Intrinsic::Any))
    }

    pub fn is_nullish(&self) -> bool {
        matches!(
            self,
            Type::Intrinsic(Intrinsic::Null) | Type::Intrinsic(Intrinsic::Undefined)
        )
    }

    /// Literal types widen to their primitive.
    pub fn widened(self) -> Type {
        match self {
            Type::Literal(text) => {
                if text.starts_with('"') {
                    Type::Intrinsic(Intrinsic::String)
                } else if text == "true" || text == "false" {
                    Type::Intrinsic(Intrinsic::Boolean)
                } else if text.ends_with('n') {
                    Type::Intrinsic(Intrinsic::BigInt)
                } else {
                    Type::Intrinsic(Intrinsic::Number)
                }
            }
            other => other,
        }
    }

    /// Build a union: nested unions flatten, duplicates collapse, and in
    /// non-strict mode `null`/`undefined` members are dropped.
    pub fn union(members: Vec<Type>, strict_null_checks: bool) -> Type {
        let mut flat: Vec<Type> = Vec::new();
        for member in members {
            let parts = match member {
                Type::Union(inner) => inner,
                other => vec![other],
            };
            for part in parts {
                if !flat.contains(&part) {
                    flat.push(part);
                }
            }
        }
        if flat.iter().any(Type::is_any) {
            return Type::ANY;
        }
        if !strict_null_checks && flat.iter().any(|t| !t.is_nullish()) {
            flat.retain(|t| !t.is_nullish());
        }
        if flat.len() == 1 {
            return flat.remove(0);
        }
        // `true | false` reads as boolean.
        let bools = ["true", "false"]
            .iter()
            .all(|b| flat.contains(&Type::Literal(b.to_string())));
        if bools {
            flat.retain(|t| !matches!(t, Type::Literal(l) if l == "true" || l == "false"));
            flat.push(Type::Intrinsic(Intrinsic::Boolean));
            if flat.len() == 1 {
                return flat.remove(0);
            }
        }
        Type::Union(flat)
    }
}

/// Parameters and return type of a call signature.
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub parameters: Vec<SymbolId>,
    pub return_type: Type,
}

/// Writes types in the compiler's display format.
///
/// `qualify` decides how a reference name is printed.
pub struct TypePrinter<'q> {
    qualify: &'q dyn Fn(&str, Option<SymbolId>) -> String,
}

impl<'q> TypePrinter<'q> {
    pub fn new(qualify: &'q dyn Fn(&str, Option<SymbolId>) -> String) -> Self {
        Self { qualify }
    }

    pub fn print(&self, ty: &Type) -> String {
        let mut out = String::new();
        self.write(&mut out, ty);
        out
    }

    fn write(&self, out: &mut String, ty: &Type) {
        match ty {
            Type::Intrinsic(intrinsic) => out.push_str(intrinsic.as_str()),
            Type::Literal(text) | Type::Raw(text) => out.push_str(text),
            Type::This => out.push_str("this"),
            Type::Reference { name, symbol, args } => {
                out.push_str(&(self.qualify)(name, *symbol));
                if !args.is_empty() {
                    out.push('<');
                    self.write_list(out, args, ", ");
                    out.push('>');
                }
            }
            Type::Array { element, readonly } => {
                if *readonly {
                    out.push_str("readonly ");
                }
                self.write_operand(out, element);
                out.push_str("[]");
            }
            Type::Tuple(elements) => {
                out.push('[');
                for (index, element) in elements.iter().enumerate() {
                    if index > 0 {
                        out.push_str(", ");
                    }
                    if element.rest {
                        out.push_str("...");
                    }
                    self.write(out, &element.ty);
                    if element.optional {
                        out.push('?');
                    }
                }
                out.push(']');
            }
            Type::Union(members) => self.write_joined(out, members, " | "),
            Type::Intersection(members) => self.write_joined(out, members, " & "),
            Type::Function(function) => {
                if function.is_constructor {
                    out.push_str("new ");
                }
                self.write_params(out, &function.params);
                out.push_str(" => ");
                self.write(out, &function.return_type);
            }
            Type::Object(members) => {
                if members.is_empty() {
                    out.push_str("{}");
                    return;
                }
                out.push_str("{ ");
                for member in members {
                    match member {
                        ObjectMember::Property {
                            name,
                            optional,
                            readonly,
                            ty,
                        } => {
                            if *readonly {
                                out.push_str("readonly ");
                            }
                            out.push_str(name);
                            if *optional {
                                out.push('?');
                            }
                            out.push_str(": ");
                            self.write(out, ty);
                        }
                        ObjectMember::Method {
                            name,
                            optional,
                            params,
                            return_type,
                        } => {
                            out.push_str(name);
                            if *optional {
                                out.push('?');
                            }
                            self.write_params(out, params);
                            out.push_str(": ");
                            self.write(out, return_type);
                        }
                        ObjectMember::Raw(text) => out.push_str(text),
                    }
                    out.push_str("; ");
                }
                out.push('}');
            }
        }
    }

    fn write_params(&self, out: &mut String, params: &[FunctionTypeParam]) {
        out.push('(');
        for (index, param) in params.iter().enumerate() {
            if index > 0 {
                out.push_str(", ");
            }
            if param.rest {
                out.push_str("...");
            }
            out.push_str(&param.name);
            if param.optional {
                out.push('?');
            }
            out.push_str(": ");
            self.write(out, &param.ty);
        }
        out.push(')');
    }

    fn write_list(&self, out: &mut String, types: &[Type], separator: &str) {
        for (index, ty) in types.iter().enumerate() {
            if index > 0 {
                out.push_str(separator);
            }
            self.write(out, ty);
        }
    }

    fn write_joined(&self, out: &mut String, members: &[Type], separator: &str) {
        for (index, member) in members.iter().enumerate() {
            if index > 0 {
                out.push_str(separator);
            }
            match member {
                Type::Function(_) => {
                    out.push('(');
                    self.write(out, member);
                    out.push(')');
                }
                Type::Union(_) | Type::Intersection(_) if separator == " & " => {
                    out.push('(');
                    self.write(out, member);
                    out.push(')');
                }
                _ => self.write(out, member),
            }
        }
    }

    /// Array element types need parentheses when they are compound.
    fn write_operand(&self, out: &mut String, ty: &Type) {
        match ty {
            Type::Union(_) | Type::Intersection(_) | Type::Function(_) => {
                out.push('(');
                self.write(out, ty);
                out.push(')');
            }
            _ => self.write(out, ty),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let written = |name: &str, _: Option<SymbolId>| name.to_string();
        f.write_str(&TypePrinter::new(&written).print(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(name: &str) -> Type {
        Type::Reference {
            name: name.to_string(),
            symbol: None,
            args: Vec::new(),
        }
    }

    #[test]
    fn test_display_forms() {
        let array_of_union = Type::Array {
            element: Box::new(Type::Union(vec![
                Type::Intrinsic(Intrinsic::String),
                reference("Thing"),
            ])),
            readonly: false,
        };
        assert_eq!(array_of_union.to_string(), "(string | Thing)[]");

        let function = Type::Function(Box::new(FunctionType {
            params: vec![FunctionTypeParam {
                name: "a".to_string(),
                optional: true,
                rest: false,
                ty: Type::Intrinsic(Intrinsic::Number),
            }],
            return_type: Type::VOID,
            is_constructor: false,
        }));
        assert_eq!(function.to_string(), "(a?: number) => void");

        let object = Type::Object(vec![
            ObjectMember::Property {
                name: "r".to_string(),
                optional: false,
                readonly: false,
                ty: Type::Intrinsic(Intrinsic::Number),
            },
            ObjectMember::Property {
                name: "g".to_string(),
                optional: false,
                readonly: false,
                ty: Type::Intrinsic(Intrinsic::Number),
            },
        ]);
        assert_eq!(object.to_string(), "{ r: number; g: number; }");

        let generic = Type::Reference {
            name: "Map".to_string(),
            symbol: None,
            args: vec![Type::Intrinsic(Intrinsic::String), reference("Thing")],
        };
        assert_eq!(generic.to_string(), "Map<string, Thing>");
    }

    #[test]
    fn test_union_normalisation() {
        let nullable = vec![reference("Thing"), Type::Intrinsic(Intrinsic::Null)];
        assert_eq!(Type::union(nullable.clone(), false), reference("Thing"));
        assert_eq!(
            Type::union(nullable, true).to_string(),
            "Thing | null"
        );

        let with_any = vec![Type::Intrinsic(Intrinsic::String), Type::ANY];
        assert_eq!(Type::union(with_any, true), Type::ANY);

        let bools = vec![
            Type::Literal("true".to_string()),
            Type::Literal("false".to_string()),
        ];
        assert_eq!(Type::union(bools, true), Type::Intrinsic(Intrinsic::Boolean));
    }

    #[test]
    fn test_widening() {
        assert_eq!(
            Type::Literal("\"a\"".to_string()).widened(),
            Type::Intrinsic(Intrinsic::String)
        );
        assert_eq!(Type::Literal("3".to_string()).widened(), Type::Intrinsic(Intrinsic::Number));
        assert_eq!(Type::Literal("true".to_string()).widened(), Type::Intrinsic(Intrinsic::Boolean));
    }
}
