//! Instruction builder positioned at an insertion point.
//!
//! Follows the "position, then emit" pattern of LLVM's `IRBuilder`: every
//! emitted instruction lands at the current [`InsertPoint`] and registers
//! its operand uses. `Before(x)` keeps inserting in front of `x`, so a run
//! of emissions comes out in call order; `After(x)` advances to each newly
//! emitted instruction for the same reason.

use smallvec::SmallVec;

use crate::ir::{BinOp, BlockId, Function, Inst, InstId, Type, Value};

/// Where the next instruction goes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertPoint {
    /// Append to the end of a block.
    End(BlockId),
    /// Immediately before an existing instruction.
    Before(InstId),
    /// Immediately after an existing instruction.
    After(InstId),
}

/// Emits instructions into a [`Function`].
pub struct Builder<'f> {
    func: &'f mut Function,
    at: InsertPoint,
}

impl<'f> Builder<'f> {
    pub fn new(func: &'f mut Function, at: InsertPoint) -> Self {
        Self { func, at }
    }

    /// Builder appending to the end of `block`.
    pub fn at_end(func: &'f mut Function, block: BlockId) -> Self {
        Self::new(func, InsertPoint::End(block))
    }

    /// Builder inserting before `anchor`.
    pub fn before(func: &'f mut Function, anchor: InstId) -> Self {
        Self::new(func, InsertPoint::Before(anchor))
    }

    /// Builder inserting after `anchor`.
    pub fn after(func: &'f mut Function, anchor: InstId) -> Self {
        Self::new(func, InsertPoint::After(anchor))
    }

    /// Move the insertion point.
    pub fn position(&mut self, at: InsertPoint) {
        self.at = at;
    }

    #[inline]
    pub fn insert_point(&self) -> InsertPoint {
        self.at
    }

    #[inline]
    pub fn func(&self) -> &Function {
        self.func
    }

    #[inline]
    pub fn func_mut(&mut self) -> &mut Function {
        self.func
    }

    /// Emit `inst` with result type `ty` at the insertion point.
    ///
    /// # Panics
    ///
    /// Panics if the insertion anchor is no longer in its block.
    pub fn emit(&mut self, inst: Inst, ty: Type) -> InstId {
        let (block, pos) = match self.at {
            InsertPoint::End(block) => (block, self.func.block(block).len()),
            InsertPoint::Before(anchor) => (self.anchor_block(anchor), self.anchor_pos(anchor)),
            InsertPoint::After(anchor) => (self.anchor_block(anchor), self.anchor_pos(anchor) + 1),
        };
        let id = self.func.insert_at(block, pos, inst, ty);
        if let InsertPoint::After(_) = self.at {
            self.at = InsertPoint::After(id);
        }
        id
    }

    fn anchor_block(&self, anchor: InstId) -> BlockId {
        let data = self.func.inst(anchor);
        debug_assert!(
            !data.is_erased(),
            "insertion anchor {} was erased",
            anchor.raw()
        );
        data.block()
    }

    fn anchor_pos(&self, anchor: InstId) -> usize {
        let block = self.func.inst(anchor).block();
        self.func
            .position_of(block, anchor)
            .unwrap_or_else(|| panic!("insertion anchor {} is not in its block", anchor.raw()))
    }

    // Constants

    /// A `<lanes x i32>` constant with every lane set to `value`.
    pub fn splat(&self, lanes: u32, value: i32) -> Value {
        Value::splat_i32(lanes, value)
    }

    // Arithmetic

    /// `lhs op rhs`; the result takes the left operand's type.
    pub fn binary(&mut self, op: BinOp, lhs: Value, rhs: Value) -> Value {
        let ty = self.func.value_type(lhs);
        Value::Inst(self.emit(Inst::Binary { op, lhs, rhs }, ty))
    }

    /// Scalar or vector addition, by operand type.
    pub fn add(&mut self, lhs: Value, rhs: Value) -> Value {
        self.binary(BinOp::Add, lhs, rhs)
    }

    // Vector lanes

    /// `vector` with lane `lane` replaced by `element`.
    pub fn insert_element(&mut self, vector: Value, element: Value, lane: u32) -> Value {
        let ty = self.func.value_type(vector);
        debug_assert!(ty.is_vector(), "insertelement into non-vector {ty:?}");
        Value::Inst(self.emit(
            Inst::InsertElement {
                vector,
                element,
                lane,
            },
            ty,
        ))
    }

    /// Lane `lane` of `vector` as a scalar.
    pub fn extract_element(&mut self, vector: Value, lane: u32) -> Value {
        let ty = self.func.value_type(vector).element();
        Value::Inst(self.emit(Inst::ExtractElement { vector, lane }, ty))
    }

    // Memory

    pub fn store(&mut self, value: Value, dest: Value) -> InstId {
        self.emit(Inst::Store { value, dest }, Type::Void)
    }

    pub fn load(&mut self, ty: Type, src: Value) -> Value {
        Value::Inst(self.emit(Inst::Load { src }, ty))
    }

    pub fn alloca(&mut self, ty: Type) -> Value {
        Value::Inst(self.emit(Inst::Alloca { ty }, Type::Ptr))
    }

    // Control

    /// Call `callee`; the returned id is the call itself (its result when
    /// `ret_ty` is not `Void`).
    pub fn call(&mut self, ret_ty: Type, callee: &str, args: &[Value]) -> InstId {
        let callee = self.func.intern(callee);
        self.emit(
            Inst::Call {
                callee,
                args: SmallVec::from_slice(args),
            },
            ret_ty,
        )
    }

    pub fn ret(&mut self, value: Option<Value>) -> InstId {
        self.emit(Inst::Ret { value }, Type::Void)
    }
}
