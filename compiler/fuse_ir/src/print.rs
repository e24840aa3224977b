//! Textual rendering of functions.
//!
//! The output is accepted by [`parse_module`](crate::parse_module), so a
//! printed function can be read back. Unnamed instructions print as `%_N`
//! with `N` the arena index, padded with trailing `_` while that name is
//! already taken by a parameter or a named instruction.

use std::fmt;

use crate::ir::{Constant, Function, Inst, InstId, Type, Value};

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => f.write_str("void"),
            Type::Int(bits) => write!(f, "i{bits}"),
            Type::Ptr => f.write_str("ptr"),
            Type::Vector { lanes, bits } => write!(f, "<{lanes} x i{bits}>"),
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Int { value, .. } => write!(f, "{value}"),
            Constant::Splat { lanes, bits, value } => {
                write!(f, "splat <{lanes} x i{bits}> {value}")
            }
        }
    }
}

/// A [`Value`] paired with the function that names it.
pub struct DisplayValue<'a> {
    func: &'a Function,
    value: Value,
}

impl fmt::Display for DisplayValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Value::Inst(id) => write_inst_name(self.func, id, f),
            Value::Arg(arg) => {
                let name = self.func.params()[arg.index()].name;
                write!(f, "%{}", self.func.symbol_str(name))
            }
            Value::Global(sym) => write!(f, "@{}", self.func.symbol_str(sym)),
            Value::Const(c) => write!(f, "{c}"),
        }
    }
}

fn write_inst_name(func: &Function, id: InstId, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match func.inst(id).name() {
        Some(name) => write!(f, "%{}", func.symbol_str(name)),
        None => {
            let mut name = format!("_{}", id.raw());
            while func.is_value_name_taken(&name) {
                name.push('_');
            }
            write!(f, "%{name}")
        }
    }
}

impl Function {
    /// Render `value` using this function's names.
    pub fn display_value(&self, value: Value) -> DisplayValue<'_> {
        DisplayValue { func: self, value }
    }

    /// Render one instruction as a single line (no indentation).
    pub fn display_inst(&self, id: InstId) -> DisplayInst<'_> {
        DisplayInst { func: self, id }
    }
}

/// An instruction rendered as one line of textual IR.
pub struct DisplayInst<'a> {
    func: &'a Function,
    id: InstId,
}

impl fmt::Display for DisplayInst<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let func = self.func;
        let data = func.inst(self.id);
        let v = |value: Value| func.display_value(value);

        if data.ty() != Type::Void {
            write_inst_name(func, self.id, f)?;
            f.write_str(" = ")?;
        }

        match data.inst() {
            Inst::Binary { op, lhs, rhs } => {
                write!(f, "{} {} {}, {}", op.mnemonic(), data.ty(), v(*lhs), v(*rhs))
            }
            Inst::Store { value, dest } => write!(f, "store {}, {}", v(*value), v(*dest)),
            Inst::Load { src } => write!(f, "load {} {}", data.ty(), v(*src)),
            Inst::Alloca { ty } => write!(f, "alloca {ty}"),
            Inst::Call { callee, args } => {
                write!(f, "call {} @{}(", data.ty(), func.symbol_str(*callee))?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", v(*arg))?;
                }
                f.write_str(")")
            }
            Inst::InsertElement {
                vector,
                element,
                lane,
            } => write!(
                f,
                "insertelement {} {}, {}, {lane}",
                data.ty(),
                v(*vector),
                v(*element)
            ),
            Inst::ExtractElement { vector, lane } => write!(
                f,
                "extractelement {} {}, {lane}",
                func.value_type(*vector),
                v(*vector)
            ),
            Inst::Ret { value: Some(value) } => write!(f, "ret {}", v(*value)),
            Inst::Ret { value: None } => f.write_str("ret"),
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn @{}(", self.name())?;
        for (i, param) in self.params().iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "%{}: {}", self.symbol_str(param.name), param.ty)?;
        }
        f.write_str(") {\n")?;
        for block in self.blocks() {
            writeln!(f, "{}:", self.symbol_str(block.label()))?;
            for &id in block.insts() {
                writeln!(f, "  {}", self.display_inst(id))?;
            }
        }
        f.write_str("}\n")
    }
}

#[cfg(test)]
mod tests;
