//! Helpers for building directory trees the way a toolchain leaves them.

use std::path::Path;

/// Create `root/obj/lib.a` and `root/CMakeCache.txt`, then mark every file and
/// the `obj` directory read-only.
pub fn make_readonly_tree(root: &Path) {
  let obj = root.join("obj");
  std::fs::create_dir_all(&obj).unwrap();
  std::fs::write(obj.join("lib.a"), b"archive").unwrap();
  std::fs::write(root.join("CMakeCache.txt"), b"cache").unwrap();

  for path in [obj.join("lib.a"), root.join("CMakeCache.txt"), obj] {
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_readonly(true);
    std::fs::set_permissions(&path, perms).unwrap();
  }
}
