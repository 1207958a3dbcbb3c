//! Structural type registry.
//!
//! Every [`TypeId`] is a `Copy` handle into a [`TypeRegistry`] arena. Two
//! handles compare equal (via plain `==`) iff the structural description of
//! the underlying type — kind, shape, const flag, and (for aliases) name —
//! is identical; the registry only ever allocates one arena slot per
//! distinct shape, so callers never need a deep structural comparison
//! themselves.
//!
//! Struct and enum types are the one nominal exception: each
//! `struct_incomplete`/`enum_incomplete` call mints a fresh id even if an
//! identically-named, identically-shaped type already exists elsewhere —
//! shadowing and redeclaration are a symbol-table concern, not a type-
//! registry one.

use crate::strings::Sym;
use std::cell::RefCell;
use std::collections::HashMap;

/// A handle into the registry arena. Equality is handle (index) equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(u32);

/// Numeric id shared by a struct/enum's const and non-const forms
///.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AggregateId(u32);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StructMember {
    pub name: Sym,
    pub ty: TypeId,
}

#[derive(Debug, Clone)]
struct StructInfo {
    name: Sym,
    members: Option<Vec<StructMember>>,
}

#[derive(Debug, Clone)]
struct EnumInfo {
    name: Sym,
    underlying: TypeId,
    variants: Option<Vec<(Sym, i64)>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Shape {
    Void,
    Nullptr,
    Auto,
    Int(u8, bool),
    Float(bool),
    Pointer(TypeId),
    Array(TypeId, Option<u64>),
    Function(TypeId, Vec<TypeId>, bool),
    Struct(AggregateId),
    Enum(AggregateId),
    Alias(Sym, TypeId),
}

/// The shape of a type, independent of its const qualifier. This is the
/// public view exposed to callers that need to branch on kind (the parser,
/// the expression layer, the IR builder's type lowering).
#[derive(Debug, Clone)]
pub enum Kind {
    Void,
    Nullptr,
    Auto,
    Int { width: u8, signed: bool },
    Float { double: bool },
    Pointer { to: TypeId },
    Array { of: TypeId, len: Option<u64> },
    Function { ret: TypeId, params: Vec<TypeId>, varargs: bool },
    Struct { id: AggregateId, name: Sym, complete: bool },
    Enum { id: AggregateId, name: Sym, underlying: TypeId, complete: bool },
    Alias { name: Sym, to: TypeId },
}

struct TypeData {
    shape: Shape,
    is_const: bool,
}

pub struct TypeRegistry {
    arena: RefCell<Vec<TypeData>>,
    dedup: RefCell<HashMap<(Shape, bool), TypeId>>,
    const_pair: RefCell<HashMap<TypeId, TypeId>>,
    structs: RefCell<HashMap<AggregateId, StructInfo>>,
    enums: RefCell<HashMap<AggregateId, EnumInfo>>,
    next_aggregate_id: RefCell<u32>,

    // Cache of commonly requested primitives so callers aren't forced to
    // thread width/signedness constants everywhere.
    void_ty: TypeId,
    nullptr_ty: TypeId,
    auto_ty: TypeId,
    bool_ty: TypeId,
    char_ty: TypeId,
    i32_ty: TypeId,
    i64_ty: TypeId,
    float_ty: TypeId,
    double_ty: TypeId,
}

impl TypeRegistry {
    pub fn new() -> Self {
        let arena = RefCell::new(Vec::new());
        let dedup = RefCell::new(HashMap::new());
        let mut reg = TypeRegistry {
            arena,
            dedup,
            const_pair: RefCell::new(HashMap::new()),
            structs: RefCell::new(HashMap::new()),
            enums: RefCell::new(HashMap::new()),
            next_aggregate_id: RefCell::new(0),
            void_ty: TypeId(0),
            nullptr_ty: TypeId(0),
            auto_ty: TypeId(0),
            bool_ty: TypeId(0),
            char_ty: TypeId(0),
            i32_ty: TypeId(0),
            i64_ty: TypeId(0),
            float_ty: TypeId(0),
            double_ty: TypeId(0),
        };
        reg.void_ty = reg.intern(Shape::Void, false);
        reg.nullptr_ty = reg.intern(Shape::Nullptr, false);
        reg.auto_ty = reg.intern(Shape::Auto, false);
        reg.bool_ty = reg.intern(Shape::Int(1, false), false);
        // `char` is platform-signedness 8-bit; we fix signed,
        // matching the common x86_64/ARM64 Linux default `clang` targets.
        reg.char_ty = reg.intern(Shape::Int(8, true), false);
        reg.i32_ty = reg.intern(Shape::Int(32, true), false);
        reg.i64_ty = reg.intern(Shape::Int(64, true), false);
        reg.float_ty = reg.intern(Shape::Float(false), false);
        reg.double_ty = reg.intern(Shape::Float(true), false);
        reg
    }

    fn intern(&self, shape: Shape, is_const: bool) -> TypeId {
        let key = (shape.clone(), is_const);
        if let Some(id) = self.dedup.borrow().get(&key) {
            return *id;
        }
        let mut arena = self.arena.borrow_mut();
        let id = TypeId(arena.len() as u32);
        arena.push(TypeData { shape, is_const });
        drop(arena);
        self.dedup.borrow_mut().insert(key, id);
        id
    }

    fn data_shape(&self, t: TypeId) -> Shape {
        self.arena.borrow()[t.0 as usize].shape.clone()
    }

    fn is_const_raw(&self, t: TypeId) -> bool {
        self.arena.borrow()[t.0 as usize].is_const
    }

    // ---- primitive constructors --------------------------------------

    pub fn void(&self) -> TypeId {
        self.void_ty
    }
    pub fn nullptr_type(&self) -> TypeId {
        self.nullptr_ty
    }
    pub fn auto(&self) -> TypeId {
        self.auto_ty
    }
    pub fn bool_type(&self) -> TypeId {
        self.bool_ty
    }
    pub fn char_type(&self) -> TypeId {
        self.char_ty
    }
    pub fn i32(&self) -> TypeId {
        self.i32_ty
    }
    pub fn i64(&self) -> TypeId {
        self.i64_ty
    }
    pub fn float(&self) -> TypeId {
        self.float_ty
    }
    pub fn double(&self) -> TypeId {
        self.double_ty
    }

    pub fn int(&self, width: u8, signed: bool) -> TypeId {
        self.intern(Shape::Int(width, signed), false)
    }

    pub fn float_kind(&self, double: bool) -> TypeId {
        self.intern(Shape::Float(double), false)
    }

    pub fn pointer(&self, to: TypeId) -> TypeId {
        self.intern(Shape::Pointer(to), false)
    }

    pub fn array(&self, of: TypeId, len: Option<u64>) -> TypeId {
        self.intern(Shape::Array(of, len), false)
    }

    pub fn function(&self, ret: TypeId, params: Vec<TypeId>, varargs: bool) -> TypeId {
        self.intern(Shape::Function(ret, params, varargs), false)
    }

    pub fn alias(&self, name: Sym, to: TypeId) -> TypeId {
        self.intern(Shape::Alias(name, to), false)
    }

    fn fresh_aggregate_id(&self) -> AggregateId {
        let mut next = self.next_aggregate_id.borrow_mut();
        let id = AggregateId(*next);
        *next += 1;
        id
    }

    /// Create a forward-declared struct. Both the non-const and const forms share `id` and are
    /// updated atomically by [`TypeRegistry::complete_struct`].
    pub fn struct_incomplete(&self, name: Sym) -> TypeId {
        let id = self.fresh_aggregate_id();
        self.structs.borrow_mut().insert(
            id,
            StructInfo {
                name,
                members: None,
            },
        );
        let non_const = self.intern(Shape::Struct(id), false);
        let const_form = self.intern(Shape::Struct(id), true);
        self.const_pair.borrow_mut().insert(non_const, const_form);
        self.const_pair.borrow_mut().insert(const_form, non_const);
        non_const
    }

    /// Fill in a struct's members. Re-completion with a different member
    /// list is a fatal error at the call site; the registry
    /// reports it as `Err` so the parser can anchor the diagnostic.
    pub fn complete_struct(
        &self,
        id: AggregateId,
        members: Vec<StructMember>,
    ) -> Result<(), String> {
        let mut structs = self.structs.borrow_mut();
        let info = structs
            .get_mut(&id)
            .expect("complete_struct called with unknown AggregateId");
        match &info.members {
            None => {
                info.members = Some(members);
                Ok(())
            }
            Some(existing) if existing == &members => Ok(()),
            Some(_) => Err(format!(
                "struct '{}' re-completed with a different member list",
                info.name
            )),
        }
    }

    pub fn enum_incomplete(&self, name: Sym, underlying: TypeId) -> TypeId {
        let id = self.fresh_aggregate_id();
        self.enums.borrow_mut().insert(
            id,
            EnumInfo {
                name,
                underlying,
                variants: None,
            },
        );
        let non_const = self.intern(Shape::Enum(id), false);
        let const_form = self.intern(Shape::Enum(id), true);
        self.const_pair.borrow_mut().insert(non_const, const_form);
        self.const_pair.borrow_mut().insert(const_form, non_const);
        non_const
    }

    pub fn complete_enum(
        &self,
        id: AggregateId,
        variants: Vec<(Sym, i64)>,
    ) -> Result<(), String> {
        let mut enums = self.enums.borrow_mut();
        let info = enums
            .get_mut(&id)
            .expect("complete_enum called with unknown AggregateId");
        match &info.variants {
            None => {
                info.variants = Some(variants);
                Ok(())
            }
            Some(existing) if existing == &variants => Ok(()),
            Some(_) => Err(format!(
                "enum '{}' re-completed with a different variant list",
                info.name
            )),
        }
    }

    // ---- const qualifier -----------------------------------------------

    /// Always defined; idempotent at the type-set level.
    pub fn get_const(&self, t: TypeId) -> TypeId {
        if self.is_const_raw(t) {
            return t;
        }
        if let Some(paired) = self.const_pair.borrow().get(&t) {
            return *paired;
        }
        let shape = self.data_shape(t);
        let const_form = self.intern(shape, true);
        self.const_pair.borrow_mut().insert(t, const_form);
        self.const_pair.borrow_mut().insert(const_form, t);
        const_form
    }

    pub fn get_const_removed(&self, t: TypeId) -> TypeId {
        if !self.is_const_raw(t) {
            return t;
        }
        if let Some(paired) = self.const_pair.borrow().get(&t) {
            return *paired;
        }
        let shape = self.data_shape(t);
        let non_const = self.intern(shape, false);
        self.const_pair.borrow_mut().insert(t, non_const);
        self.const_pair.borrow_mut().insert(non_const, t);
        non_const
    }

    pub fn is_const(&self, t: TypeId) -> bool {
        self.is_const_raw(t)
    }

    pub fn equals(&self, a: TypeId, b: TypeId) -> bool {
        a == b
    }

    // ---- introspection --------------------------------------------------

    pub fn kind(&self, t: TypeId) -> Kind {
        match self.data_shape(t) {
            Shape::Void => Kind::Void,
            Shape::Nullptr => Kind::Nullptr,
            Shape::Auto => Kind::Auto,
            Shape::Int(w, s) => Kind::Int { width: w, signed: s },
            Shape::Float(d) => Kind::Float { double: d },
            Shape::Pointer(to) => Kind::Pointer { to },
            Shape::Array(of, len) => Kind::Array { of, len },
            Shape::Function(ret, params, varargs) => Kind::Function { ret, params, varargs },
            Shape::Struct(id) => {
                let structs = self.structs.borrow();
                let info = &structs[&id];
                Kind::Struct {
                    id,
                    name: info.name.clone(),
                    complete: info.members.is_some(),
                }
            }
            Shape::Enum(id) => {
                let enums = self.enums.borrow();
                let info = &enums[&id];
                Kind::Enum {
                    id,
                    name: info.name.clone(),
                    underlying: info.underlying,
                    complete: info.variants.is_some(),
                }
            }
            Shape::Alias(name, to) => Kind::Alias { name, to },
        }
    }

    pub fn is_integer(&self, t: TypeId) -> bool {
        matches!(self.kind(t), Kind::Int { .. })
    }
    pub fn is_float(&self, t: TypeId) -> bool {
        matches!(self.kind(t), Kind::Float { .. })
    }
    pub fn is_pointer(&self, t: TypeId) -> bool {
        matches!(self.kind(t), Kind::Pointer { .. })
    }
    pub fn is_array(&self, t: TypeId) -> bool {
        matches!(self.kind(t), Kind::Array { .. })
    }
    pub fn is_function(&self, t: TypeId) -> bool {
        matches!(self.kind(t), Kind::Function { .. })
    }
    pub fn is_void(&self, t: TypeId) -> bool {
        matches!(self.kind(t), Kind::Void)
    }
    pub fn is_auto(&self, t: TypeId) -> bool {
        matches!(self.kind(t), Kind::Auto)
    }
    pub fn is_scalar(&self, t: TypeId) -> bool {
        matches!(
            self.kind(t),
            Kind::Int { .. } | Kind::Float { .. } | Kind::Pointer { .. } | Kind::Nullptr | Kind::Enum { .. }
        )
    }

    /// Unwrap alias layers to the underlying named or structural type.
    pub fn resolve_alias(&self, t: TypeId) -> TypeId {
        let mut cur = t;
        loop {
            match self.kind(cur) {
                Kind::Alias { to, .. } => cur = to,
                _ => return cur,
            }
        }
    }

    pub fn has_size(&self, t: TypeId) -> bool {
        let resolved = self.resolve_alias(t);
        match self.kind(resolved) {
            Kind::Void => false,
            Kind::Function { .. } => false,
            Kind::Array { len: None, .. } => false,
            Kind::Struct { complete, .. } => complete,
            Kind::Enum { complete, .. } => complete,
            _ => true,
        }
    }

    pub fn member_type(&self, t: TypeId, name: Sym) -> Option<TypeId> {
        let resolved = self.resolve_alias(t);
        if let Kind::Struct { id, .. } = self.kind(resolved) {
            let structs = self.structs.borrow();
            let members = structs[&id].members.as_ref()?;
            return members.iter().find(|m| m.name == name).map(|m| m.ty);
        }
        None
    }

    pub fn member_index(&self, t: TypeId, name: Sym) -> Option<usize> {
        let resolved = self.resolve_alias(t);
        if let Kind::Struct { id, .. } = self.kind(resolved) {
            let structs = self.structs.borrow();
            let members = structs[&id].members.as_ref()?;
            return members.iter().position(|m| m.name == name);
        }
        None
    }

    pub fn aggregate_size(&self, t: TypeId) -> Option<usize> {
        let resolved = self.resolve_alias(t);
        if let Kind::Struct { id, .. } = self.kind(resolved) {
            let structs = self.structs.borrow();
            return structs[&id].members.as_ref().map(|m| m.len());
        }
        None
    }

    pub fn aggregate_type(&self, t: TypeId, index: usize) -> Option<TypeId> {
        let resolved = self.resolve_alias(t);
        if let Kind::Struct { id, .. } = self.kind(resolved) {
            let structs = self.structs.borrow();
            return structs[&id]
                .members
                .as_ref()
                .and_then(|m| m.get(index))
                .map(|m| m.ty);
        }
        None
    }

    pub fn enum_variants(&self, t: TypeId) -> Option<Vec<(Sym, i64)>> {
        let resolved = self.resolve_alias(t);
        if let Kind::Enum { id, .. } = self.kind(resolved) {
            let enums = self.enums.borrow();
            return enums[&id].variants.clone();
        }
        None
    }

    // ---- conversions -----------------------------------------------------

    fn decay(&self, t: TypeId) -> TypeId {
        match self.kind(self.resolve_alias(t)) {
            Kind::Array { of, .. } => self.pointer(of),
            Kind::Function { .. } => self.pointer(t),
            _ => t,
        }
    }

    /// Implicit conversion predicate. Returns the target type
    /// if legal, `None` otherwise.
    pub fn convert(&self, from: TypeId, to: TypeId) -> Option<TypeId> {
        if self.equals(from, to) {
            return Some(to);
        }
        let from_decayed = self.decay(from);
        let from_kind = self.kind(self.resolve_alias(from_decayed));
        let to_kind = self.kind(self.resolve_alias(to));

        match (&from_kind, &to_kind) {
            // Implicit int-to-int conversion only ever widens; narrowing
            // (e.g. i64 -> i32) needs an explicit cast.
            (Kind::Int { width: from_w, .. }, Kind::Int { width: to_w, .. }) => {
                if to_w >= from_w {
                    Some(to)
                } else {
                    None
                }
            }
            (Kind::Float { .. }, Kind::Float { .. }) => Some(to),
            (Kind::Int { .. }, Kind::Float { .. }) | (Kind::Float { .. }, Kind::Int { .. }) => {
                Some(to)
            }
            (Kind::Nullptr, Kind::Pointer { .. }) => Some(to),
            (Kind::Pointer { .. }, Kind::Int { width: 1, signed: false }) => Some(to), // -> bool
            (Kind::Pointer { to: from_ref }, Kind::Pointer { to: to_ref }) => {
                let from_ref_removed = self.get_const_removed(*from_ref);
                let to_ref_removed = self.get_const_removed(*to_ref);
                let same_referent = self.equals(from_ref_removed, to_ref_removed);
                let either_void = self.is_void(self.resolve_alias(from_ref_removed))
                    || self.is_void(self.resolve_alias(to_ref_removed));
                if !(same_referent || either_void) {
                    return None;
                }
                // const may be added, never dropped.
                if self.is_const(*from_ref) && !self.is_const(*to_ref) {
                    return None;
                }
                Some(to)
            }
            _ => None,
        }
    }

    /// Superset of [`TypeRegistry::convert`]: additionally allows removing
    /// `const` from a referent and casting between arbitrary pointer
    /// referents.
    pub fn explicit_cast(&self, from: TypeId, to: TypeId) -> Option<TypeId> {
        if let Some(t) = self.convert(from, to) {
            return Some(t);
        }
        let from_decayed = self.decay(from);
        let from_kind = self.kind(self.resolve_alias(from_decayed));
        let to_kind = self.kind(self.resolve_alias(to));
        match (&from_kind, &to_kind) {
            (Kind::Pointer { .. }, Kind::Pointer { .. }) => Some(to),
            (Kind::Pointer { .. }, Kind::Int { .. }) | (Kind::Int { .. }, Kind::Pointer { .. }) => {
                Some(to)
            }
            // A narrowing int-to-int conversion `convert` already rejected;
            // an explicit cast is exactly how a caller opts into the
            // truncation.
            (Kind::Int { .. }, Kind::Int { .. }) => Some(to),
            _ => None,
        }
    }

    /// Promotion/common type used by `?:`/binary operators.
    pub fn common(&self, a: TypeId, b: TypeId) -> Option<TypeId> {
        let a = self.decay(a);
        let b = self.decay(b);
        if self.equals(a, b) {
            return Some(a);
        }
        match (self.kind(self.resolve_alias(a)), self.kind(self.resolve_alias(b))) {
            (Kind::Int { width: wa, signed: sa }, Kind::Int { width: wb, signed: sb }) => {
                let width = wa.max(wb);
                let signed = if wa == wb { sa && sb } else if wa > wb { sa } else { sb };
                Some(self.int(width, signed))
            }
            (Kind::Float { double: da }, Kind::Float { double: db }) => {
                Some(self.float_kind(da || db))
            }
            (Kind::Int { .. }, Kind::Float { .. }) => Some(b),
            (Kind::Float { .. }, Kind::Int { .. }) => Some(a),
            (Kind::Nullptr, Kind::Pointer { .. }) => Some(b),
            (Kind::Pointer { .. }, Kind::Nullptr) => Some(a),
            _ => None,
        }
    }

    /// Human-readable name, used in diagnostics.
    pub fn display_name(&self, t: TypeId) -> String {
        let prefix = if self.is_const_raw(t) { "const " } else { "" };
        let body = match self.kind(t) {
            Kind::Void => "void".to_string(),
            Kind::Nullptr => "nullptr_t".to_string(),
            Kind::Auto => "auto".to_string(),
            Kind::Int { width: 1, signed: false } => "bool".to_string(),
            Kind::Int { width, signed } => {
                format!("{}{}", if signed { "i" } else { "u" }, width)
            }
            Kind::Float { double } => if double { "f64".to_string() } else { "f32".to_string() },
            Kind::Pointer { to } => format!("-> {}", self.display_name(to)),
            Kind::Array { of, len: Some(n) } => format!("array [{}] of {}", n, self.display_name(of)),
            Kind::Array { of, len: None } => format!("array [] of {}", self.display_name(of)),
            Kind::Function { ret, params, varargs } => {
                let mut s = "fn (".to_string();
                let parts: Vec<String> = params.iter().map(|p| self.display_name(*p)).collect();
                s.push_str(&parts.join(", "));
                if varargs {
                    if !params.is_empty() {
                        s.push_str(", ");
                    }
                    s.push_str("...");
                }
                s.push_str("): ");
                s.push_str(&self.display_name(ret));
                s
            }
            Kind::Struct { name, .. } => format!("struct {}", name),
            Kind::Enum { name, .. } => format!("enum {}", name),
            Kind::Alias { name, .. } => name.to_string(),
        };
        format!("{}{}", prefix, body)
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strings::Interner;

    #[test]
    fn const_get_and_removed_are_inverses() {
        let reg = TypeRegistry::new();
        let i32 = reg.i32();
        let c = reg.get_const(i32);
        assert_eq!(reg.get_const_removed(c), i32);
        assert_eq!(reg.get_const(reg.get_const_removed(c)), c);
    }

    #[test]
    fn equal_shapes_intern_to_one_handle() {
        let reg = TypeRegistry::new();
        let a = reg.int(32, true);
        let b = reg.int(32, true);
        assert_eq!(a, b);
        let c = reg.int(32, false);
        assert_ne!(a, c);
    }

    #[test]
    fn pointer_identity_interns() {
        let reg = TypeRegistry::new();
        let p1 = reg.pointer(reg.i32());
        let p2 = reg.pointer(reg.i32());
        assert_eq!(p1, p2);
    }

    #[test]
    fn int_to_int_implicitly_widens_but_not_narrows() {
        let reg = TypeRegistry::new();
        assert_eq!(reg.convert(reg.i32(), reg.i64()), Some(reg.i64()));
        assert_eq!(reg.convert(reg.i64(), reg.i32()), None);
        assert_eq!(reg.explicit_cast(reg.i64(), reg.i32()), Some(reg.i32()));
    }

    #[test]
    fn nullptr_converts_to_any_pointer() {
        let reg = TypeRegistry::new();
        let p = reg.pointer(reg.i32());
        assert_eq!(reg.convert(reg.nullptr_type(), p), Some(p));
    }

    #[test]
    fn const_cannot_be_silently_dropped() {
        let reg = TypeRegistry::new();
        let const_i32_ptr = reg.pointer(reg.get_const(reg.i32()));
        let mut_i32_ptr = reg.pointer(reg.i32());
        assert_eq!(reg.convert(const_i32_ptr, mut_i32_ptr), None);
        assert_eq!(reg.convert(mut_i32_ptr, const_i32_ptr), Some(const_i32_ptr));
        assert_eq!(
            reg.explicit_cast(const_i32_ptr, mut_i32_ptr),
            Some(mut_i32_ptr)
        );
    }

    #[test]
    fn array_decays_to_pointer() {
        let reg = TypeRegistry::new();
        let arr = reg.array(reg.i32(), Some(4));
        let ptr = reg.pointer(reg.i32());
        assert_eq!(reg.convert(arr, ptr), Some(ptr));
    }

    #[test]
    fn struct_recompletion_with_same_members_is_ok() {
        let interner = Interner::new();
        let reg = TypeRegistry::new();
        let name = interner.intern("Point");
        let x = interner.intern("x");
        let id = match reg.kind(reg.struct_incomplete(name)) {
            Kind::Struct { id, .. } => id,
            _ => unreachable!(),
        };
        let members = vec![StructMember { name: x, ty: reg.i32() }];
        assert!(reg.complete_struct(id, members.clone()).is_ok());
        assert!(reg.complete_struct(id, members).is_ok());
    }

    #[test]
    fn struct_recompletion_with_different_members_is_err() {
        let interner = Interner::new();
        let reg = TypeRegistry::new();
        let name = interner.intern("Point");
        let x = interner.intern("x");
        let y = interner.intern("y");
        let id = match reg.kind(reg.struct_incomplete(name)) {
            Kind::Struct { id, .. } => id,
            _ => unreachable!(),
        };
        reg.complete_struct(id, vec![StructMember { name: x, ty: reg.i32() }])
            .unwrap();
        let err = reg.complete_struct(id, vec![StructMember { name: y, ty: reg.i32() }]);
        assert!(err.is_err());
    }

    #[test]
    fn const_and_non_const_struct_forms_share_id() {
        let interner = Interner::new();
        let reg = TypeRegistry::new();
        let name = interner.intern("Point");
        let non_const = reg.struct_incomplete(name);
        let const_form = reg.get_const(non_const);
        let id_a = match reg.kind(non_const) {
            Kind::Struct { id, .. } => id,
            _ => unreachable!(),
        };
        let id_b = match reg.kind(const_form) {
            Kind::Struct { id, .. } => id,
            _ => unreachable!(),
        };
        assert_eq!(id_a, id_b);
    }

    #[test]
    fn common_type_widens_and_unsigned_wins_tie() {
        let reg = TypeRegistry::new();
        let i32s = reg.int(32, true);
        let i32u = reg.int(32, false);
        let common = reg.common(i32s, i32u).unwrap();
        assert!(matches!(reg.kind(common), Kind::Int { width: 32, signed: false }));
    }
}
