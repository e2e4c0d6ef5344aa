/// Builds a [`Schema`](crate::Schema) from a member list.
///
/// Members keep the order they are written in. `#[ignore]` excludes a member
/// from encoding; `#[readonly]` marks it as having no setter.
///
/// ```rust
/// use refwire::{schema, Shape};
///
/// let person = schema!("demo.Person" => {
///     name: Shape::String,
///     friends: Shape::list(Shape::named("demo.Person")),
///     #[ignore]
///     cache: Shape::I64,
/// });
/// assert_eq!(person.members.len(), 3);
/// assert!(person.members[2].ignore);
/// ```
#[macro_export]
macro_rules! schema {
    (@member $member:expr, ) => {
        $member
    };

    (@member $member:expr, ignore $($rest:ident)*) => {
        $crate::schema!(@member $member.ignored(), $($rest)*)
    };

    (@member $member:expr, readonly $($rest:ident)*) => {
        $crate::schema!(@member $member.read_only(), $($rest)*)
    };

    ($name:expr => {}) => {
        $crate::Schema::new($name)
    };

    ($name:expr => { $( $(#[$attr:ident])* $field:ident : $shape:expr ),+ $(,)? }) => {
        $crate::Schema::new($name)
            $(
                .with_member($crate::schema!(
                    @member $crate::Member::new(stringify!($field), $shape), $($attr)*
                ))
            )+
    };
}
