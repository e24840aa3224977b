//! Function IR: an arena of instructions with stable ids and use-lists.
//!
//! # Architecture
//!
//! - **[`Function`]** — owns every instruction record in an arena indexed by
//!   [`InstId`], the ordered [`Block`]s, parameters and an interned symbol
//!   table.
//! - **[`Block`]** — a label plus the ordered list of `InstId`s that make up
//!   its instruction sequence. Position in that list is the only notion of
//!   program order; nothing caches it across a mutation.
//! - **[`Inst`]** — a closed tagged variant over instruction kinds, with
//!   numbered operand slots.
//! - **Use-lists** — for each instruction, every `(user, slot)` pair that
//!   reads its result. Kept in sync by every insertion, operand rewrite and
//!   erasure, so rewiring a consumer is a direct slot write.
//!
//! Erasing an instruction tombstones its arena slot and removes it from its
//! block. Ids are never reused, so an `InstId` held across a mutation either
//! still names the same instruction or names a tombstone.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::IrError;

// ── ID newtypes ─────────────────────────────────────────────────────

/// Instruction ID within a [`Function`]'s arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct InstId(u32);

impl InstId {
    /// Create a new instruction ID from a raw index.
    #[inline]
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw `u32` value.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }

    /// Get the index as `usize` (for indexing into `Vec`s).
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Basic block ID within a [`Function`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct BlockId(u32);

impl BlockId {
    /// Create a new block ID from a raw index.
    #[inline]
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw `u32` value.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }

    /// Get the index as `usize` (for indexing into `Vec`s).
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Function parameter index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ArgId(u32);

impl ArgId {
    #[inline]
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Interned name (parameters, globals, callees, labels, instruction names).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Symbol(u32);

impl Symbol {
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

// ── Types ───────────────────────────────────────────────────────────

/// Result and operand types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    Void,
    /// Scalar integer of the given bit width.
    Int(u16),
    Ptr,
    /// Vector of `lanes` integers of `bits` width each.
    Vector { lanes: u32, bits: u16 },
}

impl Type {
    /// The scalar 32-bit integer, the only type the add-fusion pass fuses.
    pub const I32: Type = Type::Int(32);

    /// `lanes` copies of 32-bit integers.
    pub fn i32_vector(lanes: u32) -> Type {
        Type::Vector { lanes, bits: 32 }
    }

    pub fn is_vector(self) -> bool {
        matches!(self, Type::Vector { .. })
    }

    /// The lane type of a vector, or the type itself for scalars.
    pub fn element(self) -> Type {
        match self {
            Type::Vector { bits, .. } => Type::Int(bits),
            other => other,
        }
    }
}

// ── Values ──────────────────────────────────────────────────────────

/// Compile-time constant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Constant {
    Int { bits: u16, value: i64 },
    /// A vector whose every lane holds `value`.
    Splat { lanes: u32, bits: u16, value: i64 },
}

impl Constant {
    pub fn ty(self) -> Type {
        match self {
            Constant::Int { bits, .. } => Type::Int(bits),
            Constant::Splat { lanes, bits, .. } => Type::Vector { lanes, bits },
        }
    }
}

/// Anything usable as an operand.
///
/// `Copy + Eq + Hash` so a value can serve directly as an identity key
/// (the aliasing guard keys storage destinations by `Value`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Value {
    /// The result of an instruction.
    Inst(InstId),
    /// A function parameter.
    Arg(ArgId),
    /// The address of a global symbol.
    Global(Symbol),
    Const(Constant),
}

impl Value {
    /// A 32-bit integer constant.
    pub fn i32(value: i32) -> Value {
        Value::Const(Constant::Int {
            bits: 32,
            value: i64::from(value),
        })
    }

    /// A `<lanes x i32>` vector with every lane set to `value`.
    pub fn splat_i32(lanes: u32, value: i32) -> Value {
        Value::Const(Constant::Splat {
            lanes,
            bits: 32,
            value: i64::from(value),
        })
    }

    /// The defining instruction, if this value is an instruction result.
    #[inline]
    pub fn as_inst(self) -> Option<InstId> {
        match self {
            Value::Inst(id) => Some(id),
            _ => None,
        }
    }
}

// ── Instructions ────────────────────────────────────────────────────

/// Binary arithmetic opcode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
}

impl BinOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            BinOp::Add => "add",
            BinOp::Sub => "sub",
            BinOp::Mul => "mul",
        }
    }
}

/// A single instruction.
///
/// Operand slots are numbered per variant: `Binary` 0 = `lhs`, 1 = `rhs`;
/// `Store` 0 = `value`, 1 = `dest`; `Load` 0 = `src`; `Call` one slot per
/// argument; `InsertElement` 0 = `vector`, 1 = `element`; `ExtractElement`
/// 0 = `vector`; `Ret` 0 = `value`. Lane indices are immediates, not
/// operands.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Inst {
    /// `lhs op rhs`, scalar or lane-wise on vectors.
    Binary { op: BinOp, lhs: Value, rhs: Value },
    /// Write `value` to the storage location `dest`.
    Store { value: Value, dest: Value },
    Load { src: Value },
    /// Reserve a stack slot holding one `ty`; the result is its address.
    Alloca { ty: Type },
    /// Opaque call; a side-effect and scheduling boundary.
    Call {
        callee: Symbol,
        args: SmallVec<[Value; 4]>,
    },
    /// `vector` with lane `lane` replaced by `element`.
    InsertElement {
        vector: Value,
        element: Value,
        lane: u32,
    },
    /// Lane `lane` of `vector`.
    ExtractElement { vector: Value, lane: u32 },
    Ret { value: Option<Value> },
}

impl Inst {
    /// Returns every operand in slot order.
    pub fn operands(&self) -> SmallVec<[Value; 4]> {
        match self {
            Inst::Binary { lhs, rhs, .. } => SmallVec::from_slice(&[*lhs, *rhs]),
            Inst::Store { value, dest } => SmallVec::from_slice(&[*value, *dest]),
            Inst::Load { src } => SmallVec::from_slice(&[*src]),
            Inst::Alloca { .. } | Inst::Ret { value: None } => SmallVec::new(),
            Inst::Call { args, .. } => args.clone(),
            Inst::InsertElement {
                vector, element, ..
            } => SmallVec::from_slice(&[*vector, *element]),
            Inst::ExtractElement { vector, .. } => SmallVec::from_slice(&[*vector]),
            Inst::Ret { value: Some(v) } => SmallVec::from_slice(&[*v]),
        }
    }

    /// The operand in `slot`, if the slot exists.
    pub fn operand(&self, slot: u32) -> Option<Value> {
        self.operands().get(slot as usize).copied()
    }

    /// Mutable access to the operand in `slot`.
    pub(crate) fn operand_mut(&mut self, slot: u32) -> Option<&mut Value> {
        match (self, slot) {
            (Inst::Binary { lhs, .. }, 0) => Some(lhs),
            (Inst::Binary { rhs, .. }, 1) => Some(rhs),
            (Inst::Store { value, .. }, 0) => Some(value),
            (Inst::Store { dest, .. }, 1) => Some(dest),
            (Inst::Load { src }, 0) => Some(src),
            (Inst::Call { args, .. }, n) => args.get_mut(n as usize),
            (Inst::InsertElement { vector, .. }, 0) | (Inst::ExtractElement { vector, .. }, 0) => {
                Some(vector)
            }
            (Inst::InsertElement { element, .. }, 1) => Some(element),
            (Inst::Ret { value: Some(v) }, 0) => Some(v),
            _ => None,
        }
    }

    /// The opcode as written in the textual IR.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Inst::Binary { op, .. } => op.mnemonic(),
            Inst::Store { .. } => "store",
            Inst::Load { .. } => "load",
            Inst::Alloca { .. } => "alloca",
            Inst::Call { .. } => "call",
            Inst::InsertElement { .. } => "insertelement",
            Inst::ExtractElement { .. } => "extractelement",
            Inst::Ret { .. } => "ret",
        }
    }
}

/// The four instruction categories the add-fusion pass distinguishes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InstClass {
    StorageWrite,
    Call,
    /// A scalar 32-bit integer addition.
    BinaryAdd,
    Other,
}

/// One `(user, slot)` reference to an instruction's result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Use {
    pub user: InstId,
    pub slot: u32,
}

/// Arena record for one instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstData {
    pub(crate) inst: Inst,
    pub(crate) ty: Type,
    pub(crate) block: BlockId,
    pub(crate) name: Option<Symbol>,
    pub(crate) erased: bool,
}

impl InstData {
    #[inline]
    pub fn inst(&self) -> &Inst {
        &self.inst
    }

    /// The result type (`Void` for stores, calls without a result, `ret`).
    #[inline]
    pub fn ty(&self) -> Type {
        self.ty
    }

    /// The block this instruction was inserted into.
    #[inline]
    pub fn block(&self) -> BlockId {
        self.block
    }

    #[inline]
    pub fn name(&self) -> Option<Symbol> {
        self.name
    }

    #[inline]
    pub fn is_erased(&self) -> bool {
        self.erased
    }

    /// Classify this instruction. Total over every kind.
    pub fn class(&self) -> InstClass {
        match &self.inst {
            Inst::Store { .. } => InstClass::StorageWrite,
            Inst::Call { .. } => InstClass::Call,
            Inst::Binary { op: BinOp::Add, .. } if self.ty == Type::I32 => InstClass::BinaryAdd,
            Inst::Binary { .. }
            | Inst::Load { .. }
            | Inst::Alloca { .. }
            | Inst::InsertElement { .. }
            | Inst::ExtractElement { .. }
            | Inst::Ret { .. } => InstClass::Other,
        }
    }
}

// ── Blocks ──────────────────────────────────────────────────────────

/// A basic block: a label and its ordered instruction sequence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    id: BlockId,
    label: Symbol,
    insts: Vec<InstId>,
}

impl Block {
    #[inline]
    pub fn id(&self) -> BlockId {
        self.id
    }

    #[inline]
    pub fn label(&self) -> Symbol {
        self.label
    }

    /// Live instructions in program order.
    #[inline]
    pub fn insts(&self) -> &[InstId] {
        &self.insts
    }

    pub fn len(&self) -> usize {
        self.insts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.insts.is_empty()
    }
}

/// A function parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Param {
    pub name: Symbol,
    pub ty: Type,
}

// ── Symbols ─────────────────────────────────────────────────────────

/// Per-function string interner.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct SymbolTable {
    names: Vec<String>,
    map: FxHashMap<String, Symbol>,
}

impl SymbolTable {
    fn intern(&mut self, name: &str) -> Symbol {
        if let Some(&sym) = self.map.get(name) {
            return sym;
        }
        let sym = Symbol(
            u32::try_from(self.names.len())
                .unwrap_or_else(|_| panic!("symbol count exceeds u32::MAX")),
        );
        self.names.push(name.to_owned());
        self.map.insert(name.to_owned(), sym);
        sym
    }

    fn resolve(&self, sym: Symbol) -> &str {
        &self.names[sym.0 as usize]
    }
}

// ── Functions ───────────────────────────────────────────────────────

/// A function body and the arena that owns its instructions.
///
/// `Clone` is a deep copy, which is what a pass uses to snapshot a function
/// before a rewrite it may need to undo.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Function {
    name: Symbol,
    params: Vec<Param>,
    blocks: Vec<Block>,
    insts: Vec<InstData>,
    /// Use-list of each instruction, indexed by `InstId::index()`.
    uses: Vec<SmallVec<[Use; 2]>>,
    symbols: SymbolTable,
}

impl Function {
    /// Create an empty function with no parameters and no blocks.
    pub fn new(name: &str) -> Self {
        let mut symbols = SymbolTable::default();
        let name = symbols.intern(name);
        Self {
            name,
            params: Vec::new(),
            blocks: Vec::new(),
            insts: Vec::new(),
            uses: Vec::new(),
            symbols,
        }
    }

    // Symbols and signature

    pub fn name(&self) -> &str {
        self.symbols.resolve(self.name)
    }

    pub fn intern(&mut self, name: &str) -> Symbol {
        self.symbols.intern(name)
    }

    pub fn symbol_str(&self, sym: Symbol) -> &str {
        self.symbols.resolve(sym)
    }

    /// Append a parameter and return the value bound to it.
    pub fn add_param(&mut self, name: &str, ty: Type) -> Value {
        let name = self.intern(name);
        let id = ArgId::new(
            u32::try_from(self.params.len())
                .unwrap_or_else(|_| panic!("parameter count exceeds u32::MAX")),
        );
        self.params.push(Param { name, ty });
        Value::Arg(id)
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// The address of the global `name`.
    pub fn global(&mut self, name: &str) -> Value {
        Value::Global(self.intern(name))
    }

    // Blocks

    /// Append a new empty block.
    pub fn add_block(&mut self, label: &str) -> BlockId {
        let label = self.intern(label);
        let id = BlockId::new(
            u32::try_from(self.blocks.len())
                .unwrap_or_else(|_| panic!("block count exceeds u32::MAX")),
        );
        self.blocks.push(Block {
            id,
            label,
            insts: Vec::new(),
        });
        id
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    #[inline]
    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.index()]
    }

    /// Block ids in layout order.
    ///
    /// The iterator does not borrow the function, so callers may mutate it
    /// while walking blocks.
    pub fn block_ids(&self) -> impl Iterator<Item = BlockId> {
        let count = u32::try_from(self.blocks.len())
            .unwrap_or_else(|_| panic!("block count exceeds u32::MAX"));
        (0..count).map(BlockId::new)
    }

    // Instructions

    #[inline]
    pub fn inst(&self, id: InstId) -> &InstData {
        debug_assert!(
            id.index() < self.insts.len(),
            "InstId {} out of bounds (have {} instructions)",
            id.raw(),
            self.insts.len(),
        );
        &self.insts[id.index()]
    }

    /// Number of arena slots, including tombstones.
    pub fn arena_len(&self) -> usize {
        self.insts.len()
    }

    /// Every live instruction in layout order.
    pub fn live_insts(&self) -> impl Iterator<Item = InstId> + '_ {
        self.blocks.iter().flat_map(|b| b.insts.iter().copied())
    }

    pub fn set_name(&mut self, id: InstId, name: &str) {
        let sym = self.intern(name);
        self.insts[id.index()].name = Some(sym);
    }

    /// Whether `name` names a parameter or a live instruction.
    pub fn is_value_name_taken(&self, name: &str) -> bool {
        let Some(&sym) = self.symbols.map.get(name) else {
            return false;
        };
        self.params.iter().any(|param| param.name == sym)
            || self
                .insts
                .iter()
                .any(|data| !data.is_erased() && data.name == Some(sym))
    }

    /// The type a value has when used as an operand.
    pub fn value_type(&self, value: Value) -> Type {
        match value {
            Value::Inst(id) => self.inst(id).ty,
            Value::Arg(arg) => self.params[arg.index()].ty,
            Value::Global(_) => Type::Ptr,
            Value::Const(c) => c.ty(),
        }
    }

    /// Linear scan for `inst`'s position within `block`.
    pub fn position_of(&self, block: BlockId, inst: InstId) -> Option<usize> {
        self.block(block).insts.iter().position(|&i| i == inst)
    }

    // Use-lists

    /// Every `(user, slot)` reading `id`'s result, in registration order.
    #[inline]
    pub fn uses(&self, id: InstId) -> &[Use] {
        &self.uses[id.index()]
    }

    pub fn has_uses(&self, id: InstId) -> bool {
        !self.uses[id.index()].is_empty()
    }

    // Mutation

    /// Place a new instruction at `pos` in `block` and register its uses.
    pub(crate) fn insert_at(&mut self, block: BlockId, pos: usize, inst: Inst, ty: Type) -> InstId {
        let id = InstId::new(
            u32::try_from(self.insts.len())
                .unwrap_or_else(|_| panic!("instruction count exceeds u32::MAX")),
        );
        for (slot, operand) in inst.operands().into_iter().enumerate() {
            if let Value::Inst(def) = operand {
                debug_assert!(
                    !self.insts[def.index()].erased,
                    "operand refers to erased instruction {}",
                    def.raw()
                );
                self.uses[def.index()].push(Use {
                    user: id,
                    slot: slot_index(slot),
                });
            }
        }
        self.insts.push(InstData {
            inst,
            ty,
            block,
            name: None,
            erased: false,
        });
        self.uses.push(SmallVec::new());
        self.blocks[block.index()].insts.insert(pos, id);
        id
    }

    /// Overwrite operand `slot` of `user` with `value`, moving the use entry
    /// from the old operand's use-list to the new one's.
    pub fn set_operand(&mut self, user: InstId, slot: u32, value: Value) -> Result<(), IrError> {
        if self.insts[user.index()].erased {
            return Err(IrError::Erased { inst: user });
        }
        let operand = self.insts[user.index()]
            .inst
            .operand_mut(slot)
            .ok_or(IrError::BadSlot { inst: user, slot })?;
        let old = std::mem::replace(operand, value);

        let entry = Use { user, slot };
        if let Value::Inst(def) = old {
            let list = &mut self.uses[def.index()];
            if let Some(pos) = list.iter().position(|u| *u == entry) {
                list.remove(pos);
            }
        }
        if let Value::Inst(def) = value {
            self.uses[def.index()].push(entry);
        }
        Ok(())
    }

    /// Remove `id` from its block and tombstone its arena slot.
    ///
    /// Fails while any use still references the instruction. The erased
    /// instruction's own operand uses are unregistered.
    pub fn erase(&mut self, id: InstId) -> Result<(), IrError> {
        let data = &self.insts[id.index()];
        if data.erased {
            return Err(IrError::Erased { inst: id });
        }
        let remaining = self.uses[id.index()].len();
        if remaining > 0 {
            return Err(IrError::StillUsed {
                inst: id,
                uses: remaining,
            });
        }

        let block = data.block;
        for (slot, operand) in data.inst.operands().into_iter().enumerate() {
            if let Value::Inst(def) = operand {
                let entry = Use {
                    user: id,
                    slot: slot_index(slot),
                };
                let list = &mut self.uses[def.index()];
                if let Some(pos) = list.iter().position(|u| *u == entry) {
                    list.remove(pos);
                }
            }
        }

        self.blocks[block.index()].insts.retain(|&i| i != id);
        self.insts[id.index()].erased = true;
        Ok(())
    }
}

#[inline]
fn slot_index(slot: usize) -> u32 {
    u32::try_from(slot).unwrap_or_else(|_| panic!("operand slot exceeds u32::MAX"))
}
