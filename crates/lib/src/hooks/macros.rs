/// Implements the registration surface every hook shares.
macro_rules! hook_common {
  ($discipline:expr) => {
    pub fn name(&self) -> &'static str {
      self.name
    }

    /// Remove the registration behind `handle`. Returns false if it was
    /// already gone.
    pub fn untap(&self, handle: $crate::hooks::TapHandle) -> bool {
      self.taps.remove(handle)
    }

    pub fn tap_names(&self) -> Vec<String> {
      self.taps.names()
    }

    pub fn is_used(&self) -> bool {
      !self.taps.names().is_empty()
    }

    /// Replace this hook's taps with a copy of `other`'s.
    pub fn copy_taps_from(&self, other: &Self) {
      self.taps.copy_from(&other.taps);
    }

    pub fn clear(&self) {
      self.taps.clear();
    }

    pub fn discipline(&self) -> $crate::hooks::Discipline {
      $discipline
    }
  };
}

/// Implements `HookInfo` and `Debug` for a hook type.
macro_rules! hook_info {
  ($ty:ident < $($param:ident),+ >, $discipline:expr) => {
    impl<$($param),+> $crate::hooks::HookInfo for $ty<$($param),+> {
      fn name(&self) -> &'static str {
        self.name
      }

      fn discipline(&self) -> $crate::hooks::Discipline {
        $discipline
      }

      fn tap_names(&self) -> Vec<String> {
        self.taps.names()
      }
    }

    impl<$($param),+> std::fmt::Debug for $ty<$($param),+> {
      fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!($ty))
          .field("name", &self.name)
          .field("taps", &self.taps.names())
          .finish()
      }
    }
  };
}
