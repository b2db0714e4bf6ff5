/// Implements the standard arithmetic operator traits for single-field tuple newtypes.
///
/// ```rust,ignore
/// op!(binary Money, Add, add);
/// op!(inplace Money, AddAssign, add_assign);
/// op!(unary Money, Neg, neg);
/// ```
#[macro_export]
macro_rules! op {
    (binary $t:ty, $tr:ident, $f:ident) => {
        impl $tr for $t {
            type Output = Self;

            fn $f(self, rhs: Self) -> Self::Output {
                Self(self.0.$f(rhs.0))
            }
        }
    };
    (inplace $t:ty, $tr:ident, $f:ident) => {
        impl $tr for $t {
            fn $f(&mut self, rhs: Self) {
                self.0.$f(rhs.0);
            }
        }
    };
    (unary $t:ty, $tr:ident, $f:ident) => {
        impl $tr for $t {
            type Output = Self;

            fn $f(self) -> Self::Output {
                Self(self.0.$f())
            }
        }
    };
}
