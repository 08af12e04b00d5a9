#[macro_export]
macro_rules! tls_enum_u8 {
	($name:ident => { $( $case:ident ( $val:expr ) ),* , (255) }) => {
		#[derive(Clone, Copy, Debug, PartialEq, Eq)]
		#[allow(non_camel_case_types)]
		pub enum $name {
			$(
				$case,
			)*
			unknown(u8)
		}

		impl $name {
			pub fn to_u8(&self) -> u8 {
				match self {
					$(
						$name::$case => $val,
					)*
					$name::unknown(v) => *v
				}
			}

			pub fn from_u8(v: u8) -> Self {
				match v {
					$(
						$val => $name::$case,
					)*
					_ => $name::unknown(v)
				}
			}

			pub fn parse(c: &mut $crate::parsing::ParseCursor<'_>) -> $crate::error::Result<Self> {
				Ok(Self::from_u8(c.next_u8()?))
			}

			pub fn serialize(&self, out: &mut Vec<u8>) {
				out.push(self.to_u8());
			}
		}
	};
}
